pub mod event_parser;
