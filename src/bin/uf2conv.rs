use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap_num::maybe_hex;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use uf2deploy::config::{Config, DEFAULT_BASE_ADDRESS};
use uf2deploy::deploy::{convert_or_flash, read_input, Outcome, Request};
use uf2deploy::device::Locator;
use uf2deploy::uf2::DEFAULT_MAX_PADDING;

macro_rules!print_err
{
	($err:ident, $($print:expr),+) =>
	{
		{
			use std::error::Error;
			eprint!($($print),+);
			eprintln!(": {}", $err);
			let mut source = $err.source();
			while let Some(src) = source
			{
				eprintln!("\tsource: {src}");
				source = src.source();
			}
		}
	};
}

/// Convert to UF2 or flash directly.
#[derive(Parser)]
#[command(name = "uf2conv", version, long_about = None)]
struct Args
{
	/// Input file (BIN or UF2)
	input: Option<PathBuf>,
	
	/// Base address of the application
	#[arg(short, long, value_parser = maybe_hex::<u32>, default_value_t = DEFAULT_BASE_ADDRESS)]
	base: u32,
	
	/// Write output to the named file instead of flashing
	#[arg(short, long, value_name = "FILE")]
	output: Option<PathBuf>,
	
	/// Flash this drive instead of searching for one
	#[arg(short, long, value_name = "PATH")]
	device: Option<PathBuf>,
	
	/// List connected drives
	#[arg(short, long, default_value_t = false)]
	list: bool,
	
	/// Do not flash, just convert (defaults to flash.uf2 or flash.bin)
	#[arg(short, long, default_value_t = false)]
	convert: bool,
	
	/// Board family id stored in every block
	#[arg(short, long, value_parser = maybe_hex::<u32>)]
	family: Option<u32>,
	
	/// Largest gap between blocks that is zero filled when converting to BIN
	#[arg(long, value_parser = maybe_hex::<u64>, env = "UF2_MAX_PADDING", default_value_t = DEFAULT_MAX_PADDING)]
	max_padding: u64,
	
	/// Log every step
	#[arg(short, long, default_value_t = false)]
	verbose: bool,
}

fn main() -> ExitCode
{
	let args = Args::parse();
	let level = if args.verbose {LevelFilter::Debug} else {LevelFilter::Info};
	let _ = SimpleLogger::new().with_level(level).without_timestamps().init();
	
	let locator = Locator::host();
	if args.list
	{
		for target in locator.list_targets()
		{
			println!("{} {}", target.root().display(), target.board_id());
		}
		return ExitCode::SUCCESS;
	}
	
	let Some(input) = args.input
	else
	{
		eprintln!("Need input file");
		return ExitCode::FAILURE;
	};
	let src = match read_input(&input)
	{
		Ok(src) => src,
		Err(e) =>
		{
			print_err!(e, "Could not load input");
			return ExitCode::FAILURE;
		},
	};
	
	let config = Config::new(args.base).with_board_tag(args.family).with_max_padding(args.max_padding);
	let request = Request{output: args.output, target: args.device, convert_only: args.convert};
	match convert_or_flash(&src, &config, &request, &locator)
	{
		Ok(Outcome::Converted{path, len, ..}) =>
		{
			println!("Wrote {len} bytes to {}.", path.display());
			ExitCode::SUCCESS
		},
		Ok(Outcome::Deployed(report)) =>
		{
			for target in &report.flashed
			{
				println!("Flashed {} ({})", target.root().display(), target.board_id());
			}
			ExitCode::SUCCESS
		},
		Err(e) =>
		{
			print_err!(e, "Error");
			ExitCode::FAILURE
		},
	}
}
