//! Entry point for the pangaea application.
//! Handles CLI parsing, opens the LSM files and prints or saves the resulting dataset.

use clap::Parser;
use pangaea::metadata::{print_summary, DatasetSummary};
use pangaea::netcdf_io::write_dataset;
use pangaea::open_mfdataset;

mod cli;
mod logging;

use cli::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut xds = open_mfdataset(&args.files, &args.names(), args.strategy())?;

    if args.json {
        let summary = DatasetSummary::from_dataset(&xds);
        println!("{}", serde_json::to_string_pretty(&summary.to_json())?);
    } else {
        println!("Opened {} file(s) matching {}", xds.sources().len(), args.files);
        print_summary(&xds);
    }

    if let Some(output_path) = &args.output_netcdf {
        xds.load()?;
        write_dataset(&xds, output_path)?;
        if !args.json {
            println!("✅ Saved dataset to {}", output_path.display());
        }
    }

    Ok(())
}
