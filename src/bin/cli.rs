//! Benchctl command line interface.

use std::{path::Path, process, time::Duration};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*,
    Arg, ArgMatches, ErrorKind, SubCommand,
};
use console::style;
use log::{debug, trace, warn, LevelFilter};
use simplelog::*;

use benchctl::{
    config,
    distro::{self, DistroJob, DistroOptions, Pin},
    exec::SystemRunner,
    firmware::{self, FirmwareJob, FirmwareOptions, WeekParity},
    power::{self, Address, HubPower, SettleTimes},
    CiError, PortId, PortSelector, Power, Settings, SettingsBuilder,
};

fn main() {
    println!("[bench] benchctl v{}", crate_version!());

    let matches = cli().get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'benchctl -v -v -v' or 'benchctl -vvv' vs 'benchctl -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logging disabled: {}", e);
    }

    if let Err(e) = ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(1);
    }) {
        warn!("failed to install the Ctrl+C handler: {}", e);
    }

    trace!("{:#?}", matches);

    let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32).unwrap_or_else(|_| {
        println!(
            "{}: `{}` needs to be a numeric value",
            style("error").red(),
            style("baud-rate").cyan()
        );
        process::exit(1);
    });
    let settings = SettingsBuilder::default()
        .baud_rate(baud_rate)
        .reply_deadline(millis(&matches, "REPLY_DEADLINE"))
        .finalize();
    let config_dir = config::config_dir(matches.value_of("CONFIG_DIR"));
    debug!("configuration from {}", config_dir.display());

    let result = match matches.subcommand() {
        ("power", Some(m)) => run_power(m, &settings, &config_dir),
        ("firmware", Some(m)) => run_firmware(m, &settings, &config_dir),
        ("distro", Some(m)) => run_distro(m),
        _ => unreachable!(),
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(e) => {
            println!("{}: {}", style("error").red(), e);
            1
        }
    };
    debug!("exit code: {}", exit_code);
    process::exit(exit_code);
}

// =============================================================================
// Command line
// =============================================================================

fn cli() -> App<'static, 'static> {
    App::new(crate_name!())
        .version(concat!("v", crate_version!()))
        .author(crate_authors!())
        .about(crate_description!())
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .setting(SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("CONFIG_DIR")
                .help("directory holding the hub registry and port maps")
                .long_help(
                    "directory holding `usb_hubs.json` and the port map of \
                     each hub; defaults to $BENCHCTL_CONFIG_DIR, then to the \
                     working directory.",
                )
                .short("-c")
                .long("--config-dir")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("hub serial line baud rate")
                .short("-b")
                .long("--baud-rate")
                .takes_value(true)
                .default_value("115200")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("REPLY_DEADLINE")
                .help("milliseconds to wait for the hub prompt")
                .long("--reply-deadline")
                .takes_value(true)
                .default_value("2000")
                .require_equals(true),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .subcommand(power_cli())
        .subcommand(firmware_cli())
        .subcommand(distro_cli())
}

fn seconds_arg(name: &'static str, long: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name)
        .help(help)
        .long(long)
        .takes_value(true)
        .default_value("0")
        .require_equals(true)
}

fn power_cli() -> App<'static, 'static> {
    SubCommand::with_name("power")
        .about("switch and inspect hub ports")
        .setting(SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("USB_HUB_PORT")
                .help("serial device of the hub")
                .short("-u")
                .long("--usb-hub-port")
                .takes_value(true)
                .require_equals(true)
                .conflicts_with("PLATFORM"),
        )
        .arg(
            Arg::with_name("PORT")
                .help("zero-based hub port index")
                .short("-p")
                .long("--port")
                .takes_value(true)
                .require_equals(true)
                .requires("USB_HUB_PORT")
                .conflicts_with("ALL"),
        )
        .arg(
            Arg::with_name("ALL")
                .help("act on every port of the hub")
                .long("--all")
                .requires("USB_HUB_PORT"),
        )
        .arg(
            Arg::with_name("PLATFORM")
                .help("platform unique identifier of the board, e.g. K64F[0]")
                .long_help(
                    "platform unique identifier of the board, e.g. K64F[0]; \
                     the hub and port are looked up in the configuration. \
                     When neither a platform nor a hub port is given and the \
                     terminal is interactive, the platform is picked from a \
                     list.",
                )
                .short("-P")
                .long("--platform")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(seconds_arg(
            "ON_SETTLE",
            "--on-settle",
            "seconds to wait after powering on",
        ))
        .arg(seconds_arg(
            "OFF_SETTLE",
            "--off-settle",
            "seconds to wait after powering off",
        ))
        .arg(
            Arg::with_name("MBEDLS")
                .help("list the attached boards once power was switched")
                .long("--mbedls"),
        )
        .subcommand(SubCommand::with_name("get").about("print the power state of the port"))
        .subcommand(
            SubCommand::with_name("set").about("power the port on or off").arg(
                Arg::with_name("STATE")
                    .possible_values(&["on", "off"])
                    .required(true)
                    .index(1),
            ),
        )
        .subcommand(SubCommand::with_name("restart").about("power the port off then on"))
        .subcommand(
            SubCommand::with_name("up")
                .about("power every port on, one after the other")
                .arg(
                    Arg::with_name("BETWEEN")
                        .help("seconds to wait between two ports")
                        .long("--between")
                        .takes_value(true)
                        .default_value("5")
                        .require_equals(true),
                ),
        )
        .subcommand(SubCommand::with_name("status").about("print the record of every port"))
        .subcommand(SubCommand::with_name("system").about("print the hub identification"))
        .subcommand(SubCommand::with_name("list").about("list the configured platforms"))
        .subcommand(SubCommand::with_name("probe").about("list the serial devices of this host"))
}

fn firmware_cli() -> App<'static, 'static> {
    let flag = |name: &'static str, long: &'static str, help: &'static str| {
        Arg::with_name(name).long(long).help(help)
    };
    let value = |name: &'static str, long: &'static str, help: &'static str| {
        Arg::with_name(name)
            .long(long)
            .help(help)
            .takes_value(true)
            .require_equals(true)
    };

    SubCommand::with_name("firmware")
        .about("build and test the firmware tree")
        .arg(flag("JENKINS", "--jenkins", "the tree is the working directory").conflicts_with("PROJECT"))
        .arg(value("PROJECT", "--project", "directory of the tree"))
        .arg(value("UPSTREAM", "--upstream", "repository to clone").default_value(firmware::UPSTREAM))
        .arg(flag("CLEAN", "--clean", "remove build products and test specifications"))
        .arg(flag("CLONE", "--clone", "clone the tree"))
        .arg(flag("BUILD", "--build", "build the libraries for the target"))
        .arg(flag("TEST", "--test", "run the tests on the board"))
        .arg(flag("TEST_NET", "--test-net", "generate test specifications for network tests"))
        .arg(value("TOOLCHAIN", "--toolchain", "toolchain to build with").default_value("GCC_ARM"))
        .arg(value("TARGET", "--target", "target to build for").default_value("K64F"))
        .arg(value("TARGET_ID", "--target-id", "target id of the board under test"))
        .arg(value("COMPORT", "--comport", "serial port of the board under test").requires("DISK"))
        .arg(value("DISK", "--disk", "mount point of the board under test").requires("COMPORT"))
        .arg(flag("POWER_RESTART", "--power-restart", "power cycle the board around the tests"))
        .arg(flag("BUILD_RELEASE", "--build-release", "build every target for a release"))
        .arg(flag("SYNC", "--sync", "publish the release on release days").requires("BUILD_RELEASE"))
        .arg(
            value("RELEASE_WEEK", "--release-week", "parity of the ISO weeks with a release")
                .possible_values(&["even", "odd"])
                .default_value("odd"),
        )
}

fn distro_cli() -> App<'static, 'static> {
    SubCommand::with_name("distro")
        .about("check out and build the Linux distribution")
        .arg(
            Arg::with_name("WORKSPACE")
                .help("workspace directory to create")
                .long("--workspace")
                .takes_value(true)
                .default_value("mbl_workspace")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("MANIFEST_URL")
                .help("manifest repository")
                .long("--manifest-url")
                .takes_value(true)
                .default_value(distro::MANIFEST_URL)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BRANCH")
                .help("branch of the manifest repository")
                .long("--branch")
                .takes_value(true)
                .default_value("master")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BASE_MANIFEST")
                .help("manifest of the initial checkout")
                .long("--base-manifest")
                .takes_value(true)
                .default_value("default.xml")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("MANIFEST")
                .help("manifest to pin and build")
                .long("--manifest")
                .takes_value(true)
                .default_value("default_test_01.xml")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("PIN")
                .help("check project NAME out at REVISION")
                .long("--pin")
                .value_name("NAME=REVISION")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("DOWNLOADS")
                .help("shared downloads directory to link into the workspace")
                .long("--downloads")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BUILD_SCRIPT")
                .help("script to run at the top of the workspace")
                .long("--build-script")
                .takes_value(true)
                .default_value("do_build.sh")
                .require_equals(true),
        )
}

fn seconds(m: &ArgMatches, name: &str) -> Duration {
    Duration::from_secs(value_t!(m, name, u64).unwrap_or_else(|e| e.exit()))
}

fn millis(m: &ArgMatches, name: &str) -> Duration {
    Duration::from_millis(value_t!(m, name, u64).unwrap_or_else(|e| e.exit()))
}

// =============================================================================
// Power
// =============================================================================

/// The hub line and port(s) named on the command line. Without a port, the
/// whole hub is addressed unless `need_port` is set.
fn address(m: &ArgMatches, config_dir: &Path, need_port: bool) -> Result<Address, CiError> {
    if let Some(serial_port) = m.value_of("USB_HUB_PORT") {
        let port = if m.is_present("PORT") {
            PortSelector::One(PortId::new(value_t!(m, "PORT", usize).unwrap_or_else(|e| e.exit()))?)
        } else if m.is_present("ALL") || !need_port {
            PortSelector::All
        } else {
            clap::Error::with_description(
                "--usb-hub-port needs --port or --all",
                ErrorKind::MissingRequiredArgument,
            )
            .exit()
        };
        return Ok(Address {
            serial_port: serial_port.to_owned(),
            port,
        });
    }

    let platform = match m.value_of("PLATFORM") {
        Some(platform) => platform.to_owned(),
        None if console::user_attended() => match power::choose_platform(config_dir)? {
            Some(platform) => platform,
            None => {
                println!("[bench] no platform selected");
                process::exit(1);
            }
        },
        None => clap::Error::with_description(
            "give --platform, or --usb-hub-port with --port",
            ErrorKind::MissingRequiredArgument,
        )
        .exit(),
    };
    Ok(Address::of_platform(config_dir, &platform)?)
}

fn run_power(m: &ArgMatches, settings: &Settings, config_dir: &Path) -> Result<(), CiError> {
    let settle_times = SettleTimes {
        on: seconds(m, "ON_SETTLE"),
        off: seconds(m, "OFF_SETTLE"),
    };

    match m.subcommand() {
        ("list", _) => {
            for platform in power::platforms(config_dir)? {
                println!("{}", platform);
            }
        }
        ("probe", _) => {
            for device in power::serial_devices() {
                println!("{}", device);
            }
        }
        ("up", Some(sub)) => {
            let address = address(m, config_dir, false)?;
            let mut hub = power::open(settings, &address)?;
            power::sequential_up(&mut hub, seconds(sub, "BETWEEN"))?;
            if m.is_present("MBEDLS") {
                print_boards()?;
            }
        }
        ("status", _) => {
            let address = address(m, config_dir, false)?;
            let mut hub = power::open(settings, &address)?;
            for record in power::status(&mut hub)? {
                println!("{}", record);
            }
        }
        ("system", _) => {
            let address = address(m, config_dir, false)?;
            let hub = power::open(settings, &address)?;
            let info = hub.info();
            println!("{}", style(&info.description).bold());
            for (key, value) in &info.attributes {
                println!("  {}: {}", key, value);
            }
        }
        ("get", _) => {
            let address = address(m, config_dir, true)?;
            let mut hub = power::open(settings, &address)?;
            let ports: Vec<PortId> = match address.port {
                PortSelector::One(port) => vec![port],
                PortSelector::All => PortId::all().collect(),
            };
            for port in ports {
                println!(
                    "[bench] port {} is {}",
                    port,
                    style(power::get(&mut hub, port)?).cyan()
                );
            }
        }
        ("set", Some(sub)) => {
            let state: Power = sub
                .value_of("STATE")
                .unwrap_or_default()
                .parse()
                .unwrap_or_else(|e: String| {
                    clap::Error::with_description(&e, ErrorKind::InvalidValue).exit()
                });
            let address = address(m, config_dir, true)?;
            let mut hub = power::open(settings, &address)?;
            power::set(&mut hub, address.port, state, settle_times)?;
            println!("[bench] {} {}", describe(&address), style(state).cyan());
            if m.is_present("MBEDLS") {
                print_boards()?;
            }
        }
        ("restart", _) => {
            let address = address(m, config_dir, true)?;
            let mut hub = power::open(settings, &address)?;
            power::restart(&mut hub, address.port, settle_times)?;
            println!("[bench] {} restarted", describe(&address));
            if m.is_present("MBEDLS") {
                print_boards()?;
            }
        }
        _ => unreachable!(),
    }
    Ok(())
}

/// Run the listing tool and print one line per attached board.
fn print_boards() -> Result<(), CiError> {
    let boards = firmware::list_boards(&mut SystemRunner)?;
    println!("[bench] {} board(s) attached", boards.len());
    for board in boards {
        println!(
            "  {:<20} {:<14} {:<14} {}",
            board
                .platform_name_unique
                .as_deref()
                .unwrap_or(&board.platform_name),
            board.serial_port,
            board.mount_point,
            board.target_id
        );
    }
    Ok(())
}

fn describe(address: &Address) -> String {
    match address.port {
        PortSelector::One(port) => format!("{} port {}", address.serial_port, port),
        PortSelector::All => format!("{} all ports", address.serial_port),
    }
}

// =============================================================================
// Build drivers
// =============================================================================

fn run_firmware(m: &ArgMatches, settings: &Settings, config_dir: &Path) -> Result<(), CiError> {
    let owned = |name: &str| m.value_of(name).map(str::to_owned);
    let release_week = m
        .value_of("RELEASE_WEEK")
        .unwrap_or_default()
        .parse::<WeekParity>()
        .unwrap_or_else(|e| clap::Error::with_description(&e, ErrorKind::InvalidValue).exit());

    let opts = FirmwareOptions {
        jenkins: m.is_present("JENKINS"),
        project: owned("PROJECT").unwrap_or_default(),
        upstream: owned("UPSTREAM").unwrap_or_else(|| firmware::UPSTREAM.to_owned()),
        clean: m.is_present("CLEAN"),
        clone: m.is_present("CLONE"),
        build: m.is_present("BUILD"),
        test: m.is_present("TEST"),
        test_net: m.is_present("TEST_NET"),
        build_release: m.is_present("BUILD_RELEASE"),
        sync: m.is_present("SYNC"),
        toolchain: owned("TOOLCHAIN").unwrap_or_default(),
        target: owned("TARGET").unwrap_or_default(),
        target_id: owned("TARGET_ID"),
        comport: owned("COMPORT"),
        disk: owned("DISK"),
        power_restart: m.is_present("POWER_RESTART"),
        release_week,
        ..FirmwareOptions::default()
    };
    debug!("{:#?}", opts);

    let mut power = HubPower {
        config_dir,
        settings,
    };
    FirmwareJob::new(&opts, &mut SystemRunner, &mut power).run()?;
    println!("[bench] firmware job {}", style("passed").green());
    Ok(())
}

fn run_distro(m: &ArgMatches) -> Result<(), CiError> {
    let owned = |name: &str| m.value_of(name).unwrap_or_default().to_owned();
    let pins = m
        .values_of("PIN")
        .map(|pins| pins.map(str::parse).collect::<Result<Vec<Pin>, _>>())
        .transpose()?
        .unwrap_or_default();

    let opts = DistroOptions {
        workspace: owned("WORKSPACE").into(),
        manifest_url: owned("MANIFEST_URL"),
        branch: owned("BRANCH"),
        base_manifest: owned("BASE_MANIFEST"),
        test_manifest: owned("MANIFEST").into(),
        pins,
        downloads: m.value_of("DOWNLOADS").map(Into::into),
        build_script: owned("BUILD_SCRIPT").into(),
    };
    debug!("{:#?}", opts);

    DistroJob::new(&opts, &mut SystemRunner).run()?;
    println!("[bench] distro build {}", style("passed").green());
    Ok(())
}
