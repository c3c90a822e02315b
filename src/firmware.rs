//! Continuous integration driver for the mbed firmware tree: build a target
//! with one toolchain, flash and test it on a board attached to the bench,
//! or build and publish a release.
//!
//! The job only chains external tools together. Commands go through a
//! [`CommandRunner`](crate::exec::CommandRunner) and the board is switched
//! through a [`TargetPower`](crate::power::TargetPower), so a job can be run
//! against recorders as well as against the real bench.
//!
//! **Example** - Build and test the K64F on a known board:
//! ```no_run
//! use benchctl::{
//!     exec::SystemRunner,
//!     firmware::{FirmwareJob, FirmwareOptions},
//!     power::HubPower,
//!     SettingsBuilder,
//! };
//! use std::path::Path;
//!
//! let opts = FirmwareOptions {
//!     jenkins: true,
//!     build: true,
//!     test: true,
//!     power_restart: true,
//!     target_id: Some("0240000032044e4500257009".into()),
//!     ..FirmwareOptions::default()
//! };
//! let settings = SettingsBuilder::new().finalize();
//! let mut power = HubPower {
//!     config_dir: Path::new("/etc/benchctl"),
//!     settings: &settings,
//! };
//! FirmwareJob::new(&opts, &mut SystemRunner, &mut power).run()?;
//! # Ok::<(), benchctl::CiError>(())
//! ```

mod junit;
mod listing;
mod options;
mod pipeline;
mod release;
mod spec_files;
mod toolchain;

pub use junit::{check_report, summarize, JunitSummary};
pub use listing::{
    list as list_boards, locate, parse as parse_listing, ListedDevice, LISTING_TOOL,
};
pub use options::{FirmwareOptions, TOOLS_DIR, UPSTREAM};
pub use pipeline::FirmwareJob;
pub use release::{is_release_day, WeekParity, RELEASE_DAY};
pub use spec_files::{Mut, Muts, TestSpec, MUTS_FILE, TEST_SPEC_FILE};
pub use toolchain::{private_settings, release_settings, ToolPaths, Toolchain, SETTINGS_FILE};
