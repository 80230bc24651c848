//! `chatwire` binary: run the server, the interactive console, or a one-off
//! RPC call.
//!
//! ```bash
//! chatwire server --addr 0.0.0.0:8081
//! chatwire client --addr 127.0.0.1:8081
//! chatwire call zhangsan --addr 127.0.0.1:8081
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use chatwire::codec::SerializerKind;
use chatwire::console::{render, Command, USAGE};
use chatwire::error::Result;
use chatwire::{Client, Server};

#[derive(Parser, Debug)]
#[command(name = "chatwire")]
#[command(about = "Chat and RPC over one TCP wire protocol")]
struct Cli {
    /// Payload serializer for outgoing frames (json or binary)
    #[arg(long, global = true, default_value = "json")]
    serializer: SerializerKind,

    /// Idle interval in seconds: read timeout for the server, ping interval
    /// for the client (0 disables)
    #[arg(long, global = true)]
    idle: Option<u64>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Accept clients
    Server {
        #[arg(long, default_value = "0.0.0.0:8081")]
        addr: SocketAddr,
    },
    /// Log in and chat from the terminal
    Client {
        #[arg(long, default_value = "127.0.0.1:8081")]
        addr: String,
    },
    /// Call HelloService.sayHello once and print the answer
    Call {
        name: String,
        #[arg(long, default_value = "127.0.0.1:8081")]
        addr: String,
    },
}

fn idle_interval(idle: Option<u64>, default: Duration) -> Option<Duration> {
    match idle {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => Some(default),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Server { addr } => {
            let server = Server::builder()
                .bind_addr(addr)
                .serializer(cli.serializer)
                .read_idle_timeout(idle_interval(
                    cli.idle,
                    chatwire::config::DEFAULT_READ_IDLE_TIMEOUT,
                ))
                .build()
                .await?;
            server
                .run_until(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await
        }
        Mode::Client { addr } => {
            let client = Client::builder()
                .serializer(cli.serializer)
                .write_idle_interval(idle_interval(
                    cli.idle,
                    chatwire::config::DEFAULT_WRITE_IDLE_INTERVAL,
                ))
                .connect(addr.as_str())
                .await?;
            run_console(client).await
        }
        Mode::Call { name, addr } => {
            let client = Client::builder()
                .serializer(cli.serializer)
                .write_idle_interval(None)
                .connect(addr.as_str())
                .await?;
            let greeting = client.hello_service().say_hello(&name).await?;
            println!("{}", greeting);
            client.close();
            Ok(())
        }
    }
}

async fn prompt<R>(lines: &mut tokio::io::Lines<R>, label: &str) -> Result<Option<String>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

async fn run_console(mut client: Client) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let Some(username) = prompt(&mut lines, "username: ").await? else {
        return Ok(());
    };
    let Some(password) = prompt(&mut lines, "password: ").await? else {
        return Ok(());
    };

    let status = client.login(&username, &password).await?;
    println!("{}", status.reason);
    if !status.success {
        client.close();
        return Ok(());
    }
    println!("{}", USAGE);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Some(message) = command.into_message(&username) {
                            client.send(&message).await?;
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            message = client.next_message() => match message {
                Some(message) => println!("{}", render(&message)),
                None => {
                    println!("server closed the connection");
                    break;
                }
            },
        }
    }

    client.close();
    Ok(())
}
