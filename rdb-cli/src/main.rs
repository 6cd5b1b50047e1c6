#[macro_use]
extern crate log;

use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use structopt::StructOpt;

use rdb_core::NullDecompressor;

#[derive(StructOpt, Debug)]
#[structopt(name = "rdb-cli")]
enum Opt {
    /// Decodes a snapshot file and writes it out as JSON
    Parse {
        /// Write 2-space indented JSON instead of compact output
        #[structopt(long)]
        pretty: bool,

        /// Emit the flat key -> value shape instead of the full
        /// version/aux/db/keys document
        #[structopt(long)]
        simple: bool,

        #[structopt(parse(from_os_str))]
        input: PathBuf,

        #[structopt(parse(from_os_str))]
        output: Option<PathBuf>,
    },
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    match opt {
        Opt::Parse { pretty, simple, input, output } => {
            let file = File::open(&input)?;
            let snapshot = rdb_core::parse(file, &NullDecompressor)?;
            info!(
                "decoded {} keys from {} (version {})",
                snapshot.len(),
                input.display(),
                snapshot.rdb_version
            );

            let mut writer: Box<dyn Write> = match output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(io::stdout()),
            };

            if simple {
                write_json(&mut writer, &snapshot.as_simple(), pretty)?;
            } else {
                write_json(&mut writer, &snapshot.as_full(), pretty)?;
            }
            writer.flush()?;
        }
    }

    Ok(())
}

fn write_json<W: Write, T: serde::Serialize>(
    writer: &mut W,
    value: &T,
    pretty: bool,
) -> serde_json::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(writer, value)
    } else {
        serde_json::to_writer(writer, value)
    }
}

fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let opt = Opt::from_args();
    if let Err(error) = run(opt) {
        error!("{}", error);
        if !log_enabled!(log::Level::Error) {
            eprintln!("ERROR: {}", error);
        }
        process::exit(1);
    }
}
