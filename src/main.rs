use clap::Parser as ClapParser;
use gfmark::{Error, Options, Parser, Result, render_with_options};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(author, version, about = "Render CommonMark/GFM to HTML", long_about = None)]
struct Cli {
    /// Markdown file to read; stdin when omitted
    file: Option<PathBuf>,

    #[arg(long, help = "Path to a JSON options file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Print the parsed document tree as JSON instead of HTML")]
    ast: bool,

    #[arg(long, help = "Enable the GFM tagfilter")]
    tagfilter: bool,

    #[arg(long, help = "Disable every GFM extension")]
    commonmark: bool,

    #[arg(long, help = "Emit <br>, <hr> and <img> without the trailing slash")]
    html4: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Log debug (-v) or trace (-vv) output")]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
        }
    }
    builder.init();
}

fn load_options(cli: &Cli) -> Result<Options> {
    let mut options = match &cli.config {
        Some(path) => Options::from_json_file(path)?,
        None => Options::default(),
    };
    if cli.commonmark {
        options = Options {
            xhtml: options.xhtml,
            max_nesting: options.max_nesting,
            ..Options::commonmark()
        };
    }
    if cli.tagfilter {
        options.tagfilter = true;
    }
    if cli.html4 {
        options.xhtml = false;
    }
    Ok(options)
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        }),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(|source| Error::Io {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?;
            Ok(input)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let options = load_options(cli)?;
    log::debug!("options: {:?}", options);
    let input = read_input(cli.file.as_ref())?;

    let document = Parser::with_options(options.clone()).parse(&input);
    if cli.ast {
        let json = serde_json::to_string_pretty(&document).map_err(Error::Serialize)?;
        println!("{}", json);
    } else {
        print!("{}", render_with_options(&document, &options));
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
