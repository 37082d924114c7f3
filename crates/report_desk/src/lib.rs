//! Report desk: log in or sign up, then file bug reports behind the route
//! guard.

pub mod auth;
pub mod cli;
pub mod config;
pub mod desk;
pub mod errors;
pub mod models;
pub mod navigation;
pub mod reports;

pub use desk::{Collaborators, Desk, ReportView};

/// Application identity used for directories and log file names.
pub struct ReportDesk;

impl app::Application for ReportDesk {
    const APP_ID: &'static str = "report_desk";
}
