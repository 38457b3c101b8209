use crate::services::onchain::{
    u256_to_game_id, GameCreatedFilter, GameEndedFilter, PieceTakenFilter, PlayerJoinedFilter,
};
use ethers::abi::RawLog;
use ethers::contract::{EthEvent, EthLogDecode};
use ethers::types::{Address, Log, U256};

/// Chess contract events the service reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChessGameEvent {
    GameCreated { game_id: u64 },
    PlayerJoined { game_id: u64, player: Address },
    PieceTaken { game_id: u64, player: Address, piece_type: u8 },
    GameEnded { game_id: u64, player: Address },
}

/// Event Parser - decodes raw contract logs into `ChessGameEvent`s
pub struct EventParser;

impl EventParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a log based on its first topic. Logs that do not match a known
    /// event signature, or fail to decode, are dropped.
    pub fn parse_event(&self, log: &Log) -> Option<ChessGameEvent> {
        let topic0 = log.topics.first()?;
        let raw = RawLog::from(log.clone());

        if *topic0 == GameCreatedFilter::signature() {
            let decoded = decode_or_skip::<GameCreatedFilter>(&raw)?;
            return Some(ChessGameEvent::GameCreated {
                game_id: game_id_of(decoded.game_id)?,
            });
        }
        if *topic0 == PlayerJoinedFilter::signature() {
            let decoded = decode_or_skip::<PlayerJoinedFilter>(&raw)?;
            return Some(ChessGameEvent::PlayerJoined {
                game_id: game_id_of(decoded.game_id)?,
                player: decoded.player,
            });
        }
        if *topic0 == PieceTakenFilter::signature() {
            let decoded = decode_or_skip::<PieceTakenFilter>(&raw)?;
            return Some(ChessGameEvent::PieceTaken {
                game_id: game_id_of(decoded.game_id)?,
                player: decoded.player,
                piece_type: decoded.piece_type,
            });
        }
        if *topic0 == GameEndedFilter::signature() {
            let decoded = decode_or_skip::<GameEndedFilter>(&raw)?;
            return Some(ChessGameEvent::GameEnded {
                game_id: game_id_of(decoded.game_id)?,
                player: decoded.player,
            });
        }

        tracing::debug!("Ignoring unknown contract event topic {:?}", topic0);
        None
    }
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_or_skip<T: EthLogDecode>(raw: &RawLog) -> Option<T> {
    match T::decode_log(raw) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::debug!("Dropping undecodable contract event: {}", e);
            None
        }
    }
}

fn game_id_of(value: U256) -> Option<u64> {
    match u256_to_game_id(value) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::debug!("Dropping event with out-of-range game id: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{encode, Token};
    use ethers::types::{Bytes, H256};

    fn log_with(topics: Vec<H256>, data: Vec<u8>) -> Log {
        Log {
            topics,
            data: Bytes::from(data),
            ..Default::default()
        }
    }

    #[test]
    fn parses_game_created_from_indexed_topic() {
        let parser = EventParser::new();
        let log = log_with(
            vec![GameCreatedFilter::signature(), H256::from_low_u64_be(7)],
            Vec::new(),
        );
        assert_eq!(
            parser.parse_event(&log),
            Some(ChessGameEvent::GameCreated { game_id: 7 })
        );
    }

    #[test]
    fn parses_player_joined_payload() {
        let parser = EventParser::new();
        let player = Address::from_low_u64_be(0xBEEF);
        let log = log_with(
            vec![PlayerJoinedFilter::signature(), H256::from_low_u64_be(3)],
            encode(&[Token::Address(player)]),
        );
        assert_eq!(
            parser.parse_event(&log),
            Some(ChessGameEvent::PlayerJoined { game_id: 3, player })
        );
    }

    #[test]
    fn parses_piece_taken_payload() {
        let parser = EventParser::new();
        let player = Address::from_low_u64_be(0xBEEF);
        let log = log_with(
            vec![PieceTakenFilter::signature(), H256::from_low_u64_be(3)],
            encode(&[Token::Address(player), Token::Uint(U256::from(2u8))]),
        );
        assert_eq!(
            parser.parse_event(&log),
            Some(ChessGameEvent::PieceTaken {
                game_id: 3,
                player,
                piece_type: 2,
            })
        );
    }

    #[test]
    fn unknown_topics_are_dropped() {
        let parser = EventParser::new();
        let log = log_with(vec![H256::from_low_u64_be(0xDEAD)], Vec::new());
        assert_eq!(parser.parse_event(&log), None);
    }

    #[test]
    fn logs_without_topics_are_dropped() {
        let parser = EventParser::new();
        assert_eq!(parser.parse_event(&log_with(Vec::new(), Vec::new())), None);
    }

    #[test]
    fn truncated_payload_is_dropped() {
        let parser = EventParser::new();
        let log = log_with(
            vec![PlayerJoinedFilter::signature(), H256::from_low_u64_be(3)],
            vec![0u8; 4],
        );
        assert_eq!(parser.parse_event(&log), None);
    }
}
