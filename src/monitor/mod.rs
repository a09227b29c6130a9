pub mod feed;
pub mod filter;
pub mod ingestor;
pub mod opener;
pub mod sink;
pub mod sol_price;

pub use feed::{decode_frame, FeedFrame, NewTokenEvent};
pub use filter::{FilterEngine, FilterResult};
pub use ingestor::{FrameOutcome, IngestorConfig, IngestorState, SessionCounters, SessionPipeline, StreamIngestor};
pub use opener::{LinkOpener, LogOpener};
pub use sink::{AcceptedToken, BroadcastSink, LogSink, MonitorEvent, StatusLevel, TokenSink};
pub use sol_price::{SolPrice, SolPriceTracker};
