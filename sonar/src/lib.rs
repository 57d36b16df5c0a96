pub mod commands;
pub mod handlers;

pub use commands::{CLAP_STYLING, command_argument_builder};
pub use handlers::{
    format_result_line, job_config_from_matches, load_targets_from_source, output_dir,
    parse_pause_command,
};
