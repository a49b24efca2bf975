pub mod books_manager;
pub mod documents;
pub mod errors;
pub mod services;
pub mod standard_chart;
pub mod utils;
