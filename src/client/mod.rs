//! # Connection handling
//!
//! One task per WebSocket connection. The handshake requires the
//! `quillpad` subprotocol; the request path selects between the
//! authenticated command loop (`/`) and the public read-only page
//! (`/p/<slug>`), which answers once and closes.
use crate::command::{Command, ParseCommandError};
use crate::service::{
    ConnId, Reply, RequestError, RequestKind, ServiceClient, ServiceError,
};
use crate::session::UserId;
use color_eyre::eyre::WrapErr;
use color_eyre::Report;
use futures_util::future::{select, Either};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::*;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_stream::wrappers::IntervalStream;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tungstenite::http::{
    header::SEC_WEBSOCKET_PROTOCOL, response::Response as HttpResponse, status::StatusCode,
    uri::Uri,
};
use tungstenite::{handshake::server, Message};

/// The subprotocol clients must offer
const PROTOCOL: &str = "quillpad";
/// Interval between keep-alive pings
const PING_INTERVAL: Duration = Duration::from_secs(30);

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

fn make_callback(tx: oneshot::Sender<Uri>) -> impl server::Callback {
    move |http_req: &server::Request, mut http_rep: server::Response| {
        let headers = http_req.headers();
        if let Some(value) = headers.get(SEC_WEBSOCKET_PROTOCOL) {
            if value == PROTOCOL {
                http_rep
                    .headers_mut()
                    .append(SEC_WEBSOCKET_PROTOCOL, value.clone());
                if tx.send(http_req.uri().clone()).is_err() {
                    error!("Handshake receiver dropped");
                }
                Ok(http_rep)
            } else {
                error!("Invalid protocol {:?}", value);
                let msg = format!("Invalid protocol {:?}", value);
                let mut rep = HttpResponse::new(Some(msg));
                *rep.status_mut() = StatusCode::NOT_ACCEPTABLE;
                Err(rep)
            }
        } else {
            error!("Missing Sec-WebSocket-Protocol header");
            let msg = String::from("Missing Sec-WebSocket-Protocol header");
            let mut rep = HttpResponse::new(Some(msg));
            *rep.status_mut() = StatusCode::NOT_ACCEPTABLE;
            Err(rep)
        }
    }
}

enum CommandRes {
    Break,
    Continue,
}

async fn send_service_error(ws_sender: &mut WsSink, err: ServiceError) -> Result<(), Report> {
    let msg = match &err {
        ServiceError::Invalid(inner) => format!("invalid|{}|{}", inner.field(), inner),
        other => format!("error|{}", other),
    };
    ws_sender.send(Message::text(msg)).await?;
    Ok(())
}

async fn send_reply(
    user: &mut Option<UserId>,
    ws_sender: &mut WsSink,
    reply: Reply,
) -> Result<(), Report> {
    let msg = match reply {
        Reply::Session(uid) => {
            let msg = format!("init|{}", uid);
            *user = Some(uid);
            msg
        }
        Reply::Created(id) => format!("created|{}", id),
        Reply::Updated(id) => format!("updated|{}", id),
        Reply::Deleted => String::from("deleted"),
        Reply::Sharing(state) => format!("sharing|{}", serde_json::to_string(&state)?),
        Reply::Note(payload) => format!("note|{}", serde_json::to_string(&payload)?),
        Reply::Listing(notes) => format!("notes|{}", serde_json::to_string(&notes)?),
        Reply::Rendered(page) => format!("html|{}", serde_json::to_string(&page)?),
    };
    ws_sender.send(Message::text(msg)).await?;
    Ok(())
}

async fn handle_command(
    id: ConnId,
    user: &mut Option<UserId>,
    sc: &mut ServiceClient,
    ws_sender: &mut WsSink,
    cmd_res: Result<Command, ParseCommandError>,
) -> Result<CommandRes, Report> {
    let cmd = match cmd_res {
        Ok(cmd) => cmd,
        Err(err) => {
            ws_sender
                .send(Message::text(format!("error|{}", err)))
                .await?;
            return Ok(CommandRes::Continue);
        }
    };

    // Everything except `init` needs a session.
    macro_rules! session {
        ($user:expr, $ws:expr) => {
            match $user.as_ref() {
                Some(user) => user.clone(),
                None => {
                    let msg = format!("error|{}", ServiceError::NotAuthenticated);
                    $ws.send(Message::text(msg)).await?;
                    return Ok(CommandRes::Continue);
                }
            }
        };
    }

    let kind = match cmd {
        Command::Close => return Ok(CommandRes::Break),
        Command::Init(token) => RequestKind::Auth { token },
        Command::Create(payload) => RequestKind::Create {
            user: session!(user, ws_sender),
            payload,
        },
        Command::Update(payload) => RequestKind::Update {
            user: session!(user, ws_sender),
            payload,
        },
        Command::Delete(note_id) => RequestKind::Delete {
            user: session!(user, ws_sender),
            note_id,
        },
        Command::Share(note_id, enable) => RequestKind::Share {
            user: session!(user, ws_sender),
            note_id,
            enable,
        },
        Command::Fetch(note_id) => RequestKind::Fetch {
            user: session!(user, ws_sender),
            note_id,
        },
        Command::List => RequestKind::List {
            user: session!(user, ws_sender),
        },
        Command::Render(note_id) => RequestKind::Render {
            user: session!(user, ws_sender),
            note_id,
        },
    };

    match sc.request(id, kind).await {
        Ok(reply) => {
            send_reply(user, ws_sender, reply).await?;
            Ok(CommandRes::Continue)
        }
        Err(RequestError::Service(err)) => {
            send_service_error(ws_sender, err).await?;
            Ok(CommandRes::Continue)
        }
        Err(err) => {
            error!("Note service unavailable: {}", err);
            Ok(CommandRes::Break)
        }
    }
}

async fn handle_message(
    id: ConnId,
    user: &mut Option<UserId>,
    msg: Message,
    sc: &mut ServiceClient,
    ws_sender: &mut WsSink,
) -> Result<CommandRes, Report> {
    match msg {
        Message::Text(t) => handle_command(id, user, sc, ws_sender, t.parse()).await,
        Message::Binary(b) => {
            ws_sender.send(Message::binary(b)).await?;
            Ok(CommandRes::Continue)
        }
        Message::Close(c) => {
            debug!("WebSocket closed ({:?})", c);
            Ok(CommandRes::Break)
        }
        Message::Ping(p) => {
            ws_sender.send(Message::Pong(p)).await?;
            Ok(CommandRes::Continue)
        }
        Message::Pong(_) => Ok(CommandRes::Continue),
    }
}

async fn handle_public(
    id: ConnId,
    slug: &str,
    sc: &mut ServiceClient,
    ws_sender: &mut WsSink,
) -> Result<(), Report> {
    let request = RequestKind::Public {
        slug: slug.to_owned(),
    };
    match sc.request(id, request).await {
        Ok(Reply::Rendered(page)) => {
            let msg = format!("html|{}", serde_json::to_string(&page)?);
            ws_sender.send(Message::text(msg)).await?;
        }
        Ok(reply) => warn!("Unexpected reply to a public render: {:?}", reply),
        Err(RequestError::Service(err)) => {
            send_service_error(ws_sender, err).await?;
        }
        Err(err) => return Err(err.into()),
    }
    ws_sender.send(Message::Close(None)).await?;
    Ok(())
}

pub async fn handle_connection(
    mut sc: ServiceClient,
    id: ConnId,
    peer: SocketAddr,
    stream: TcpStream,
) -> Result<(), Report> {
    let (tx, rx) = oneshot::channel::<Uri>();
    let ws_stream: WebSocketStream<TcpStream> = accept_hdr_async(stream, make_callback(tx)).await?;
    let uri: Uri = rx.await.wrap_err("Callback dropped")?;
    let start_time = Instant::now();

    info!("New WebSocket connection: {} ({}) to {}", peer, id, uri);
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let path = urlencoding::decode(uri.path())?;
    if let Some(slug) = path.strip_prefix("/p/") {
        return handle_public(id, slug, &mut sc, &mut ws_sender).await;
    }

    let mut user: Option<UserId> = None;
    let mut interval = IntervalStream::new(tokio::time::interval(PING_INTERVAL));

    let mut msg_fut = ws_receiver.next();
    let mut int_fut = interval.next();
    loop {
        match select(msg_fut, int_fut).await {
            Either::Left((msg, int_fut_continue)) => {
                match msg {
                    Some(Ok(msg)) => {
                        match handle_message(id, &mut user, msg, &mut sc, &mut ws_sender).await {
                            Ok(CommandRes::Continue) => {}
                            Ok(CommandRes::Break) => break,
                            Err(err) => {
                                error!("Could not handle message: {}", err);
                                break;
                            }
                        }
                    }
                    Some(Err(err)) => {
                        error!("Error on input stream: {}", err);
                        break;
                    }
                    None => {
                        debug!("WebSocket stream was terminated unexpectedly");
                        break;
                    }
                }
                int_fut = int_fut_continue;
                msg_fut = ws_receiver.next();
            }
            Either::Right((opt_instant, msg_fut_continue)) => {
                trace!("Send ping to {}", id);
                if let Some(time) = opt_instant {
                    let dur = time.into_std().duration_since(start_time);
                    let bytes: [u8; 16] = dur.as_micros().to_le_bytes();
                    let vec: Vec<u8> = Vec::from(&bytes[..]);
                    if let Err(err) = ws_sender.send(Message::Ping(vec)).await {
                        error!("Could not send ping: {}", err);
                        break;
                    }
                }
                msg_fut = msg_fut_continue;
                int_fut = interval.next();
            }
        }
    }

    trace!("Leaving handle_connection");

    Ok(())
}
