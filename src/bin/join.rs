use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};
use tracing::{error, info};
use xliff_core::logging;
use xliff_core::services::join;

fn command() -> Command {
    Command::new("join")
        .about("Combine single-file XLIFF documents into one multi-file XLIFF document")
        .disable_help_flag(true)
        .arg(
            Arg::new("help")
                .long("help")
                .help("Display this help information and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .value_name("targetFile")
                .help("Combined output XLIFF file"),
        )
        .arg(
            Arg::new("files")
                .long("files")
                .value_name("file1,file2,...")
                .help("List of XLIFF files to join, separated by ','"),
        )
}

/// Accept single-dash long flags (`-files`) and glue back path arguments
/// that were split on spaces.
fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for arg in args {
        if matches!(arg.as_str(), "-files" | "-target" | "-help") {
            out.push(format!("-{arg}"));
        } else if arg.starts_with('-') {
            out.push(arg);
        } else {
            match out.last_mut() {
                Some(prev) if !prev.starts_with('-') => {
                    prev.push(' ');
                    prev.push_str(&arg);
                }
                _ => out.push(arg),
            }
        }
    }
    out
}

fn split_files(list: &str) -> Vec<PathBuf> {
    list.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn print_help() {
    if let Err(e) = command().print_help() {
        eprintln!("{e}");
    }
    println!();
}

fn main() -> ExitCode {
    logging::init();

    let args = normalize_args(std::env::args().skip(1));
    if args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let matches = match command().try_get_matches_from(std::iter::once("join".to_string()).chain(args)) {
        Ok(m) => m,
        Err(e) => {
            error!("{e}");
            print_help();
            return ExitCode::FAILURE;
        }
    };
    if matches.get_flag("help") {
        print_help();
        return ExitCode::SUCCESS;
    }

    let files = matches
        .get_one::<String>("files")
        .map(|list| split_files(list))
        .unwrap_or_default();
    for file in &files {
        if !file.exists() {
            error!("File '{}' does not exist.", file.display());
            return ExitCode::FAILURE;
        }
    }

    let target = match matches.get_one::<String>("target").filter(|t| !t.is_empty()) {
        Some(t) => t,
        None => {
            print_help();
            return ExitCode::FAILURE;
        }
    };

    match join::join(&files, Path::new(target)) {
        Ok(report) => {
            info!(files = report.files, output = %report.output.display(), "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_dash_flags_are_accepted() {
        assert_eq!(
            normalize_args(strings(&["-files", "a.xlf,b.xlf", "-target", "out.xlf"])),
            strings(&["--files", "a.xlf,b.xlf", "--target", "out.xlf"])
        );
    }

    #[test]
    fn split_paths_are_rejoined() {
        assert_eq!(
            normalize_args(strings(&["-target", "My", "Documents/out.xlf"])),
            strings(&["--target", "My Documents/out.xlf"])
        );
    }

    #[test]
    fn file_list_is_comma_separated() {
        assert_eq!(
            split_files("a.xlf, b.xlf,,c.xlf"),
            vec![PathBuf::from("a.xlf"), PathBuf::from("b.xlf"), PathBuf::from("c.xlf")]
        );
    }

    #[test]
    fn cli_definition_parses_normalized_args() {
        let m = command()
            .try_get_matches_from(strings(&["join", "--files", "a,b", "--target", "o.xlf"]))
            .unwrap();
        assert_eq!(m.get_one::<String>("target").map(String::as_str), Some("o.xlf"));
        assert!(!m.get_flag("help"));
    }
}
