//! Terminal dashboard for captured requests and replays

mod app;
mod runner;
mod ui;

pub use runner::run;
pub use ui::draw;
