// ABOUTME: command line client for the copilot daemon's unix socket.
// ABOUTME: sends one request line per invocation and prints the single reply.

use clap::{Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use cosh::{exec_line, is_pong, ping_line, raw_line, suggest_line};

const DEFAULT_SOCKET: &str = "/tmp/copilotd.sock";

#[derive(Debug, Parser)]
#[command(name = "cosh", about = "shell-side client for copilotd")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask the daemon for its PONG reply.
    Ping {
        #[arg(long, env = "COPILOT_SOCKET", default_value = DEFAULT_SOCKET)]
        socket_path: String,
    },
    /// Run a shell command on the daemon host and print its output.
    Exec {
        #[arg(long, env = "COPILOT_SOCKET", default_value = DEFAULT_SOCKET)]
        socket_path: String,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Ask the language model for a command suggestion.
    Suggest {
        #[arg(long, env = "COPILOT_SOCKET", default_value = DEFAULT_SOCKET)]
        socket_path: String,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        input: Vec<String>,
    },
    /// Send a raw request line (from --line, --file, or stdin).
    Raw {
        #[arg(long, env = "COPILOT_SOCKET", default_value = DEFAULT_SOCKET)]
        socket_path: String,

        #[arg(long)]
        line: Option<String>,

        #[arg(long)]
        file: Option<String>,
    },
    /// Check whether the daemon is accepting connections.
    Probe {
        #[arg(long, env = "COPILOT_SOCKET", default_value = DEFAULT_SOCKET)]
        socket_path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Ping { socket_path } => {
            let reply = send(&socket_path, &ping_line()).await?;
            println!("{reply}");
            if !is_pong(&reply) {
                std::process::exit(1);
            }
        }
        Command::Exec {
            socket_path,
            command,
        } => {
            let reply = send(&socket_path, &exec_line(&command)?).await?;
            print!("{reply}");
        }
        Command::Suggest { socket_path, input } => {
            let reply = send(&socket_path, &suggest_line(&input)?).await?;
            println!("{reply}");
        }
        Command::Raw {
            socket_path,
            line,
            file,
        } => {
            let input = read_input(line.as_deref(), file.as_deref()).await?;
            let reply = send(&socket_path, &raw_line(&input)?).await?;
            print!("{reply}");
        }
        Command::Probe { socket_path } => {
            if UnixStream::connect(&socket_path).await.is_ok() {
                println!("OK");
            } else {
                println!("FAIL");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn read_input(line: Option<&str>, file: Option<&str>) -> anyhow::Result<String> {
    if let Some(line) = line {
        return Ok(line.to_string());
    }

    if let Some(file) = file {
        return Ok(tokio::fs::read_to_string(file).await?);
    }

    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    Ok(input)
}

async fn send(socket_path: &str, line: &str) -> anyhow::Result<String> {
    let mut stream = UnixStream::connect(socket_path).await?;
    stream.write_all(line.as_bytes()).await?;
    stream.shutdown().await?;

    let mut reply = String::new();
    stream.read_to_string(&mut reply).await?;
    Ok(reply)
}
