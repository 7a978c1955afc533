//! Argument-vector construction for one engine run.
//!
//! ```text
//! <command> -cp <lib1:lib2> -Djava.awt.headless=true <entry-point>
//!           [--multi] [--possible_formats F1,F2] [--pure_barcode] --try_harder <input>
//! ```
//!
//! The fixed prefix comes from [`ReaderConfig::arg_template`]; its `LIBS`
//! slot is replaced by the library archives joined with the platform's
//! path-list separator (`:` on Unix, `;` on Windows).

use crate::config::{DecodeOptions, ReaderConfig, LIBS_PLACEHOLDER};
use crate::error::DecodeError;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;

/// A fully resolved engine command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Value following `flag`, if the flag is present.
    pub fn flag_value(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Build the command line decoding `input_path` with `options`.
pub fn build_invocation(
    config: &ReaderConfig,
    options: &DecodeOptions,
    input_path: &Path,
) -> Result<Invocation, DecodeError> {
    let classpath = std::env::join_paths(config.classpath_entries())
        .map_err(|e| DecodeError::InvalidConfig(format!("library path: {e}")))?;

    let mut args: Vec<OsString> = config
        .arg_template
        .iter()
        .map(|a| {
            if a == LIBS_PLACEHOLDER {
                classpath.clone()
            } else {
                OsString::from(a)
            }
        })
        .collect();

    if options.multi_scan {
        args.push("--multi".into());
    }
    if let Some(formats) = options.formats_arg() {
        args.push("--possible_formats".into());
        args.push(formats.into());
    }
    if options.pure_barcode {
        args.push("--pure_barcode".into());
    }
    args.push("--try_harder".into());
    args.push(input_path.as_os_str().to_owned());

    Ok(Invocation {
        program: OsString::from(&config.command),
        args,
    })
}
