use clap::Parser;

/// This is a use-of-force incident tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON run configuration describing the incident files, the census
    /// source and the coverage-area tables. For more information about the file format,
    /// read the documentation of the uof_analytics crate.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (dir path, optional) If specified, overrides the output directory of the
    /// configuration file. All the output tables and the JSON summary are written there.
    #[clap(short, long, value_parser)]
    pub out_dir: Option<String>,

    /// (file path, optional) A reference file containing a run summary in JSON format.
    /// If provided, uoftab will check that the produced summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
