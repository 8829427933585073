/// Answer submission path.
pub mod answer_service;
/// Authoritative answering-window deadline scheduler.
pub mod deadline_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Question set management.
pub mod question_service;
/// Leaderboard aggregation.
pub mod ranking_service;
/// Round lifecycle engine.
pub mod round_service;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervisor.
pub mod storage_supervisor;
/// Venue and team management.
pub mod venue_service;
