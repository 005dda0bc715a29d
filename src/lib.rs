//! Terminal planner for the hours left in the current day.
//! A day runs from a configurable start time to the same time the next day in a chosen zone.
//! Categories carry daily targets, tasks and logged time count against them, and a stopwatch timer
//! records sessions that can later be credited to a category.
//!

pub mod cli;
pub mod planner;
pub mod storage;
pub mod utils;
