//! Command-line flags.

use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: passages [OPTIONS]

Options:
  --no-cache        Ignore the local copy and do not update it
  --refresh         Download the dataset and update the local copy
  --clear-cache     Delete the local copy and exit
  --cache-info      Show the state of the local copy and exit
  --legacy          Use the unpaginated v1 endpoint
  --output <PATH>   Write the records to PATH as JSON
  -h, --help        Show this message";

#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub no_cache: bool,
    pub refresh: bool,
    pub clear_cache: bool,
    pub cache_info: bool,
    pub legacy: bool,
    pub help: bool,
    pub output: Option<PathBuf>,
}

impl Args {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--no-cache" => parsed.no_cache = true,
                "--refresh" => parsed.refresh = true,
                "--clear-cache" => parsed.clear_cache = true,
                "--cache-info" => parsed.cache_info = true,
                "--legacy" => parsed.legacy = true,
                "-h" | "--help" => parsed.help = true,
                "--output" | "-o" => {
                    let path = args.next().ok_or("--output needs a path")?;
                    parsed.output = Some(PathBuf::from(path));
                }
                other => return Err(format!("Unknown argument: {}", other)),
            }
        }
        if parsed.no_cache && parsed.refresh {
            return Err("--no-cache and --refresh cannot be combined".to_string());
        }
        Ok(parsed)
    }
}
