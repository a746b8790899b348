pub mod annotations;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod files;
pub mod plot_results;
pub mod predictions;
pub mod run_logs;
pub mod stats;
pub mod summary_table;
pub mod video;
pub mod video_stats;
pub mod visualization;
