pub mod client;
pub mod command;
pub mod config;
pub mod content;
pub mod model;
pub mod render;
pub mod sanitize;
pub mod service;
pub mod session;
pub mod store;
pub mod util;
pub mod validation;

use crate::client::handle_connection;
use crate::config::Flags;
use crate::service::{ConnId, NoteService, ServiceClient};
use crate::store::NoteStore;
use crate::util::Counter;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Report;
use log::*;
use std::net::{SocketAddr, ToSocketAddrs};
use structopt::StructOpt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

async fn accept_connection(sc: ServiceClient, id: ConnId, peer: SocketAddr, stream: TcpStream) {
    if let Err(e) = handle_connection(sc, id, peer, stream).await {
        error!("Error processing connection {}: {}", id, e);
    }
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    color_eyre::install()?;
    if std::env::var(env_logger::DEFAULT_FILTER_ENV).is_err() {
        std::env::set_var(
            env_logger::DEFAULT_FILTER_ENV,
            #[cfg(debug_assertions)]
            "warn,quillpad_server=trace",
            #[cfg(not(debug_assertions))]
            "warn,quillpad_server=info",
        );
    }
    env_logger::init();

    let flags = Flags::from_args();
    let cfg = flags.load_cfg().await?;

    let addr = cfg
        .addr
        .as_str()
        .to_socket_addrs()
        .wrap_err("Invalid bind address")?
        .next()
        .ok_or_else(|| eyre!("Bind address resolved to nothing"))?;

    let store = NoteStore::open(cfg.notes_dir).await?;

    let (req_tx, req_rx) = mpsc::channel(100);
    let (ter_tx, ter_rx) = oneshot::channel::<()>();

    tokio::spawn(NoteService::new(req_rx, ter_rx, store, cfg.sessions).run());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if ter_tx.send(()).is_err() {
                error!("Note service already gone");
            }
        }
    });

    let listener = TcpListener::bind(&addr).await.wrap_err("Can't listen")?;
    info!("Listening on: {}", addr);

    let mut next_conn = Counter::<ConnId>::default();
    while let Ok((stream, peer)) = listener.accept().await {
        let id = next_conn.next();
        let sc = ServiceClient::from(req_tx.clone());
        tokio::spawn(accept_connection(sc, id, peer, stream));
    }

    Ok(())
}
