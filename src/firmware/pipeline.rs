//! The firmware job: clean, clone, build, power-cycle and test a target,
//! stopping at the first failing step.

use std::{fs, path::Path};

use chrono::{Local, NaiveDate};
use log::{info, warn};

use crate::{
    error::CiError,
    exec::{CommandRunner, ShellCommand},
    hub::Power,
    power::TargetPower,
};

use super::{
    junit, listing,
    options::FirmwareOptions,
    release::is_release_day,
    spec_files,
    toolchain::{self, Toolchain, SETTINGS_FILE},
};

pub struct FirmwareJob<'a> {
    opts: &'a FirmwareOptions,
    runner: &'a mut dyn CommandRunner,
    power: &'a mut dyn TargetPower,
}
impl<'a> FirmwareJob<'a> {
    pub fn new(
        opts: &'a FirmwareOptions,
        runner: &'a mut dyn CommandRunner,
        power: &'a mut dyn TargetPower,
    ) -> Self {
        FirmwareJob {
            opts,
            runner,
            power,
        }
    }

    pub fn run(&mut self) -> Result<(), CiError> {
        self.run_on(Local::now().date_naive())
    }

    /// Run the job as if today were `today`, which only matters to the
    /// release sync.
    pub fn run_on(&mut self, today: NaiveDate) -> Result<(), CiError> {
        if self.opts.build_release {
            return self.build_release(today);
        }
        if self.opts.clean {
            self.clean()?;
        }
        if self.opts.clone {
            self.clone_tree()?;
        }
        if self.opts.test_net {
            self.generate_spec_files()?;
        }
        if self.opts.build {
            self.write_private_settings()?;
            self.build()?;
        }
        if self.opts.power_restart {
            self.switch_target(Power::Off)?;
            self.switch_target(Power::On)?;
        }
        if self.opts.test {
            let result = self.test();
            if result.is_err() && self.opts.power_restart {
                if let Err(e) = self.switch_target(Power::Off) {
                    warn!("could not power the target off: {}", e);
                }
            }
            result?;
        }
        if self.opts.power_restart {
            self.switch_target(Power::Off)?;
        }
        Ok(())
    }

    /// Remove build products and generated test specifications.
    pub fn clean(&mut self) -> Result<(), CiError> {
        let build_dir = self.opts.tree().join("build");
        if build_dir.exists() {
            info!("removing {}", build_dir.display());
            fs::remove_dir_all(&build_dir).map_err(CiError::file(&build_dir))?;
        }
        spec_files::remove(&self.opts.tools_dir())
    }

    pub fn clone_tree(&mut self) -> Result<(), CiError> {
        let opts = self.opts;
        let command = ShellCommand::new("git")
            .arg("clone")
            .arg(opts.upstream.as_str())
            .arg(path_arg(&opts.tree()));
        self.runner.run(&command)
    }

    pub fn write_private_settings(&mut self) -> Result<(), CiError> {
        let toolchain: Toolchain = self.opts.toolchain.parse()?;
        let text = toolchain::private_settings(toolchain, &self.opts.tool_paths);
        write_settings(&self.opts.tools_dir(), &text)
    }

    pub fn build(&mut self) -> Result<(), CiError> {
        let opts = self.opts;
        let command = script(opts, "build.py").args(vec![
            "-t",
            opts.toolchain.as_str(),
            "-m",
            opts.target.as_str(),
        ]);
        self.runner.run(&command)
    }

    /// Write `test_spec.json` and `muts_all.json`. The board is found in the
    /// device listing by target id, or given as comport and disk.
    pub fn generate_spec_files(&mut self) -> Result<(), CiError> {
        let opts = self.opts;
        let (port, disk) = match (&opts.target_id, opts.explicit_device()) {
            (Some(target_id), _) => {
                let device = listing::locate(self.runner, target_id)?;
                info!(
                    "{} is {} on {} at {}",
                    target_id, device.platform_name, device.serial_port, device.mount_point
                );
                (device.serial_port, device.mount_point)
            }
            (None, Some((port, disk))) => (port.to_owned(), disk.to_owned()),
            (None, None) => return Err(CiError::NoDeviceAddress),
        };

        let dir = opts.tools_dir();
        spec_files::write_test_spec(&dir, &opts.target, &opts.toolchain)?;
        spec_files::write_muts(&dir, &opts.target, &port, &disk, opts.test_net)?;
        Ok(())
    }

    /// Run the test runner then judge its JUnit report.
    pub fn test(&mut self) -> Result<(), CiError> {
        let opts = self.opts;
        let tools = opts.tools_dir();
        let mut command = script(opts, "singletest.py").args(vec![
            "-f".to_owned(),
            opts.target.clone(),
            format!("--tc={}", opts.toolchain),
            "-j".into(),
            "8".into(),
            "-v".into(),
            "--report-junit".into(),
            path_arg(&opts.junit_report()),
            "--report-html".into(),
            path_arg(&opts.html_report()),
            "-c".into(),
            "copy".into(),
            "--global-loops".into(),
            "5".into(),
            "-W".into(),
        ]);

        if opts.target_id.is_some() || opts.explicit_device().is_some() {
            self.generate_spec_files()?;
            command = command
                .arg("-i")
                .arg(path_arg(&tools.join(spec_files::TEST_SPEC_FILE)))
                .arg("-M")
                .arg(path_arg(&tools.join(spec_files::MUTS_FILE)));
        } else {
            command = command.arg("--auto");
        }

        self.runner.run(&command)?;
        junit::check_report(&opts.junit_report()).map(|_| ())
    }

    /// Build every target for every toolchain, and publish on release days
    /// when asked to.
    pub fn build_release(&mut self, today: NaiveDate) -> Result<(), CiError> {
        let opts = self.opts;
        if opts.clean {
            self.clean()?;
        }
        if opts.clone {
            self.clone_tree()?;
        }
        write_settings(
            &opts.tools_dir(),
            &toolchain::release_settings(&opts.tool_paths),
        )?;
        self.runner.run(&script(opts, "build_release.py"))?;

        if opts.sync {
            self.sync(today)?;
        }
        Ok(())
    }

    fn sync(&mut self, today: NaiveDate) -> Result<(), CiError> {
        if !is_release_day(today, self.opts.release_week) {
            info!(
                "{} is not a release day ({} weeks), not publishing",
                today, self.opts.release_week
            );
            return Ok(());
        }
        info!("{} is a release day, publishing", today);
        let command = script(self.opts, "synch.py").args(vec!["-m", "-n"]);
        self.runner.run(&command)
    }

    fn switch_target(&mut self, power: Power) -> Result<(), CiError> {
        let settle_for = match power {
            Power::On => self.opts.power_on_settle,
            Power::Off => self.opts.power_off_settle,
        };
        self.power.power(&self.opts.platform(), power, settle_for)
    }
}

/// `python <tools dir>/<name>`
fn script(opts: &FirmwareOptions, name: &str) -> ShellCommand {
    ShellCommand::new("python").arg(path_arg(&opts.tools_dir().join(name)))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn write_settings(tools_dir: &Path, text: &str) -> Result<(), CiError> {
    let path = tools_dir.join(SETTINGS_FILE);
    fs::write(&path, text).map_err(CiError::file(&path))?;
    info!("wrote {}", path.display());
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::options::TOOLS_DIR;
    use std::time::Duration;
    use tempfile::TempDir;

    const PASSING: &str = "<testsuite><testcase name=\"a\"/></testsuite>";

    /// Records commands; `singletest.py` writes the configured report.
    #[derive(Default)]
    struct Recorder {
        commands: Vec<String>,
        report: Option<(std::path::PathBuf, &'static str)>,
        listing: &'static str,
        fail_on: Option<&'static str>,
    }
    impl CommandRunner for Recorder {
        fn run(&mut self, command: &ShellCommand) -> Result<(), CiError> {
            self.commands.push(command.to_string());
            if let Some(script) = self.fail_on {
                if command.to_string().contains(script) {
                    return Err(CiError::NoDeviceAddress);
                }
            }
            if command.to_string().contains("singletest.py") {
                if let Some((path, xml)) = &self.report {
                    fs::write(path, xml).unwrap();
                }
            }
            Ok(())
        }
        fn output(&mut self, command: &ShellCommand) -> Result<String, CiError> {
            self.commands.push(command.to_string());
            Ok(self.listing.to_owned())
        }
    }

    #[derive(Default)]
    struct Switches(Vec<(String, Power, Duration)>);
    impl TargetPower for Switches {
        fn power(&mut self, platform: &str, power: Power, settle: Duration) -> Result<(), CiError> {
            self.0.push((platform.to_owned(), power, settle));
            Ok(())
        }
    }

    fn tree() -> (TempDir, FirmwareOptions) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(TOOLS_DIR)).unwrap();
        let opts = FirmwareOptions {
            project: dir.path().to_string_lossy().into_owned(),
            ..FirmwareOptions::default()
        };
        (dir, opts)
    }

    #[test]
    fn build_writes_settings_then_builds() {
        let (dir, mut opts) = tree();
        opts.build = true;
        let mut runner = Recorder::default();
        let mut power = Switches::default();
        FirmwareJob::new(&opts, &mut runner, &mut power).run().unwrap();

        let settings = fs::read_to_string(dir.path().join(TOOLS_DIR).join(SETTINGS_FILE)).unwrap();
        assert!(settings.starts_with("GCC_ARM_PATH = "));
        assert_eq!(runner.commands.len(), 1);
        assert!(runner.commands[0].ends_with("build.py -t GCC_ARM -m K64F"));
        assert!(power.0.is_empty());
    }

    #[test]
    fn unsupported_toolchain_stops_before_build() {
        let (_dir, mut opts) = tree();
        opts.build = true;
        opts.toolchain = "IAR".into();
        let mut runner = Recorder::default();
        let mut power = Switches::default();
        let result = FirmwareJob::new(&opts, &mut runner, &mut power).run();
        assert!(matches!(result, Err(CiError::UnsupportedToolchain(_))));
        assert!(runner.commands.is_empty());
    }

    #[test]
    fn test_with_target_id_uses_listing_and_power_cycles() {
        let (dir, mut opts) = tree();
        opts.test = true;
        opts.power_restart = true;
        opts.target_id = Some("0240".into());
        let mut runner = Recorder {
            report: Some((opts.junit_report(), PASSING)),
            listing: "|K64F |/media/MBED |/dev/ttyACM0 |0240 |\n",
            ..Recorder::default()
        };
        let mut power = Switches::default();
        FirmwareJob::new(&opts, &mut runner, &mut power).run().unwrap();

        assert_eq!(runner.commands[0], "mbedls");
        assert!(runner.commands[1].contains("-i "));
        assert!(runner.commands[1].contains("muts_all.json"));
        let muts = spec_files::read_muts(&dir.path().join(TOOLS_DIR)).unwrap();
        assert_eq!(muts["1"].port, "/dev/ttyACM0");
        assert_eq!(muts["1"].disk, "/media/MBED");

        let sequence: Vec<Power> = power.0.iter().map(|(_, p, _)| *p).collect();
        assert_eq!(sequence, vec![Power::Off, Power::On, Power::Off]);
        assert_eq!(power.0[0].0, "K64F[0]");
        assert_eq!(power.0[1].2, Duration::from_secs(10));
    }

    #[test]
    fn failing_report_fails_the_job_and_powers_off() {
        let (_dir, mut opts) = tree();
        opts.test = true;
        opts.power_restart = true;
        let mut runner = Recorder {
            report: Some((
                opts.junit_report(),
                "<testcase name=\"a\"><failure message=\"x\"/></testcase>",
            )),
            ..Recorder::default()
        };
        let mut power = Switches::default();
        let result = FirmwareJob::new(&opts, &mut runner, &mut power).run();

        assert!(matches!(result, Err(CiError::TestsFailed { failures: 1, .. })));
        assert!(runner.commands[0].contains("--auto"));
        assert_eq!(power.0.last().map(|(_, p, _)| *p), Some(Power::Off));
    }

    #[test]
    fn first_failure_aborts_remaining_steps() {
        let (_dir, mut opts) = tree();
        opts.clone = true;
        opts.build = true;
        let mut runner = Recorder {
            fail_on: Some("git"),
            ..Recorder::default()
        };
        let mut power = Switches::default();
        assert!(FirmwareJob::new(&opts, &mut runner, &mut power).run().is_err());
        assert_eq!(runner.commands.len(), 1);
    }

    #[test]
    fn test_net_without_device_is_an_error() {
        let (_dir, mut opts) = tree();
        opts.test_net = true;
        let mut runner = Recorder::default();
        let mut power = Switches::default();
        assert!(matches!(
            FirmwareJob::new(&opts, &mut runner, &mut power).run(),
            Err(CiError::NoDeviceAddress)
        ));
    }

    #[test]
    fn clean_removes_build_and_spec_files() {
        let (dir, mut opts) = tree();
        opts.clean = true;
        fs::create_dir_all(dir.path().join("build/K64F")).unwrap();
        spec_files::write_test_spec(&opts.tools_dir(), "K64F", "GCC_ARM").unwrap();
        let mut runner = Recorder::default();
        let mut power = Switches::default();
        FirmwareJob::new(&opts, &mut runner, &mut power).run().unwrap();
        assert!(!dir.path().join("build").exists());
        assert!(!opts.tools_dir().join(spec_files::TEST_SPEC_FILE).exists());
    }

    #[test]
    fn release_syncs_only_on_release_day() {
        let (dir, mut opts) = tree();
        opts.build_release = true;
        opts.sync = true;
        let monday_odd = NaiveDate::from_ymd_opt(2015, 6, 15).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2015, 6, 16).unwrap();

        let mut runner = Recorder::default();
        let mut power = Switches::default();
        FirmwareJob::new(&opts, &mut runner, &mut power)
            .run_on(tuesday)
            .unwrap();
        assert_eq!(runner.commands.len(), 1);
        assert!(runner.commands[0].ends_with("build_release.py"));

        let mut runner = Recorder::default();
        FirmwareJob::new(&opts, &mut runner, &mut power)
            .run_on(monday_odd)
            .unwrap();
        assert!(runner.commands[1].ends_with("synch.py -m -n"));

        let settings = fs::read_to_string(dir.path().join(TOOLS_DIR).join(SETTINGS_FILE)).unwrap();
        assert!(settings.contains("IAR_PATH = "));
    }
}
