use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pick one image per slide, never reusing an image within the run
    Select {
        /// JSON file with an array of {title, content, keywords, topic}
        #[clap(short, long)]
        slides: Option<PathBuf>,

        /// Single slide title (ignored when --slides is given)
        #[clap(short, long)]
        title: Option<String>,

        /// Single slide body text
        #[clap(short, long, default_value = "")]
        content: String,

        /// Presentation topic applied to every slide without one
        #[clap(long)]
        topic: Option<String>,
    },

    /// Translate a search query with the configured provider
    Translate {
        text: String,

        /// Source language code; detected from the script when omitted
        #[clap(long)]
        from: Option<String>,

        /// Target language code; defaults to the configured one
        #[clap(long)]
        to: Option<String>,

        /// Cache scope, usually the presentation topic
        #[clap(long, default_value = "")]
        context: String,

        /// Only check whether the provider answers
        #[clap(long, default_value = "false")]
        check: bool,
    },

    /// Similarity between a slide and an image description
    Similarity {
        #[clap(short, long)]
        title: String,

        #[clap(short, long, default_value = "")]
        content: String,

        /// Image description
        description: String,
    },

    /// Search and print candidates ranked against a slide
    Rank {
        #[clap(short, long)]
        title: String,

        #[clap(short, long, default_value = "")]
        content: String,

        /// Search query; the title is used when omitted
        #[clap(short, long)]
        query: Option<String>,

        /// Rank candidates from a JSON file instead of searching
        #[clap(long, conflicts_with = "query")]
        candidates: Option<PathBuf>,

        /// How many ranked candidates to print
        #[clap(short = 'k', long, default_value = "5")]
        top: usize,
    },
}
