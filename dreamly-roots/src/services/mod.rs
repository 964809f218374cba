//! Service modules for the dream root-word pipeline
//!
//! Hosted-model clients, per-root emoji resolution, the pipeline itself and
//! the map aggregation worker.

pub mod dream_analyzer;
pub mod emoji_picker;
pub mod emoji_resolver;
pub mod geocoder;
pub mod map_ingest;
pub mod model_client;
pub mod pipeline;
pub mod root_extractor;
pub mod root_translator;

pub use dream_analyzer::{AnalysisError, DreamAnalysis, DreamAnalyzer};
pub use emoji_picker::{candidates_from_value, EmojiPicker, PickCandidate, PickedEmoji};
pub use emoji_resolver::EmojiResolver;
pub use geocoder::{CityRef, Coordinates, GeocodeError, MapboxGeocoder};
pub use map_ingest::{ChannelMapIngest, MapIngestError, MapIngestEvent, MapIngestSink, MapIngestor};
pub use model_client::{LanguageModel, ModelError, OpenAiClient, StructuredRequest, TextRequest};
pub use pipeline::{DesiredCounts, DreamPipeline, PipelineError, PipelineOutcome, ProcessedDream};
pub use root_extractor::{ExtractedRoots, ExtractionFailure, RootExtractor};
pub use root_translator::RootTranslator;
