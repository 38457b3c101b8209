// src/api/mod.rs

pub mod game;
pub mod health;

// AppState definition
use crate::config::Config;
use crate::services::{NoticeCenter, Reconciler};

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Reconciler,
    pub notices: NoticeCenter,
    pub config: Config,
}
