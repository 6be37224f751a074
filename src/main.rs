mod cli;
mod config;
mod logging;

fn main() -> anyhow::Result<()> {
    let command_line_interface = cli::CommandLineInterface::load();
    logging::setup_logging(command_line_interface.verbose());
    command_line_interface.run()
}
