//! Risk policy and aggregation shared by every renderer

pub mod knowledge_base;
pub mod recommendations;
pub mod risk;
pub mod statistics;

pub use knowledge_base::{KnowledgeBase, PortInfo};
pub use recommendations::RecommendationEngine;
pub use risk::classify;
pub use statistics::{FrequencyTable, OsStatistics, PortStateCounts, ReportStatistics, RiskCounts};
