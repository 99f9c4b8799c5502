pub mod calendar;
pub mod error;
pub mod feed;
pub mod index;
pub mod output;
pub mod pipeline;
pub mod schedule;
pub mod stops;
