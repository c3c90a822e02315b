//! Toolchains and the `private_settings.py` file telling the firmware build
//! scripts where they are installed.

use std::{fmt, str::FromStr};

use crate::error::CiError;

/// Name of the settings module read by the firmware build scripts.
pub const SETTINGS_FILE: &str = "private_settings.py";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    /// GNU Arm Embedded.
    GccArm,
    /// Arm Compiler with the standard C library.
    Arm,
    /// Arm Compiler with the micro C library.
    MicroArm,
}
impl Toolchain {
    pub fn name(self) -> &'static str {
        match self {
            Toolchain::GccArm => "GCC_ARM",
            Toolchain::Arm => "ARM",
            Toolchain::MicroArm => "uARM",
        }
    }
}
impl FromStr for Toolchain {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GCC_ARM" => Ok(Toolchain::GccArm),
            "ARM" | "ARM_CC" => Ok(Toolchain::Arm),
            "uARM" => Ok(Toolchain::MicroArm),
            other => Err(CiError::UnsupportedToolchain(other.to_owned())),
        }
    }
}
impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Install locations of the compilers on the build node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Arm Compiler root, without the trailing `bin`.
    pub arm: String,
    pub gcc_arm: String,
    pub gcc_cs: String,
    pub gcc_cr: String,
    pub iar: String,
}
impl Default for ToolPaths {
    fn default() -> Self {
        ToolPaths {
            arm: "/opt/mbed_tools/ARMCompiler_5.03_117".into(),
            gcc_arm: "/opt/mbed_tools/gcc-arm-none-eabi-4_9-2014q4/bin".into(),
            gcc_cs: "/opt/mbed_tools/CodeSourcery/Sourcery_CodeBench_Lite_for_ARM_EABI/bin".into(),
            gcc_cr: "/opt/mbed_tools/nxp/LPCXpresso_7.1.1_125/lpcxpresso/tools/bin".into(),
            iar: "/opt/mbed_tools/IAR Systems/Embedded Workbench 7.0/arm".into(),
        }
    }
}

fn arm_block(paths: &ToolPaths, c_library: &str) -> String {
    format!(
        "from os.path import join\n\
         \n\
         ARM_PATH = \"{}\"\n\
         ARM_BIN = join(ARM_PATH, \"bin\")\n\
         ARM_INC = join(ARM_PATH, \"include\")\n\
         ARM_LIB = join(ARM_PATH, \"lib\")\n\
         {}\n\
         \n",
        paths.arm, c_library
    )
}

const CPPLIB: &str = "ARM_CPPLIB = join(ARM_LIB, \"cpplib\")";
const MICROLIB: &str = "ARM_CLIB = join(ARM_PATH, \"lib\", \"microlib\")";

/// Settings for building with a single toolchain.
pub fn private_settings(toolchain: Toolchain, paths: &ToolPaths) -> String {
    match toolchain {
        Toolchain::GccArm => format!("GCC_ARM_PATH = \"{}\"\n", paths.gcc_arm),
        Toolchain::Arm => arm_block(paths, CPPLIB),
        Toolchain::MicroArm => arm_block(paths, MICROLIB),
    }
}

/// Settings for a release build, which compiles for every toolchain.
pub fn release_settings(paths: &ToolPaths) -> String {
    let mut text = arm_block(paths, CPPLIB);
    for (name, path) in &[
        ("GCC_ARM_PATH", &paths.gcc_arm),
        ("GCC_CS_PATH", &paths.gcc_cs),
        ("GCC_CR_PATH", &paths.gcc_cr),
        ("IAR_PATH", &paths.iar),
    ] {
        text.push_str(&format!("{} = \"{}\"\n\n", name, path));
    }
    text
}
