use std::{
    error::Error,
    net::{TcpListener, TcpStream},
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc, Mutex,
    },
    thread::spawn,
};

use log::{debug, warn};
use tungstenite::{
    accept_hdr,
    handshake::server::{Request, Response},
    Message, WebSocket,
};

use crate::streamer;

type Peers = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Starts a websocket server on `addr`.
/// Case records are read from `/ws/cases`, model snapshots are broadcast to every `/ws/clusters` subscriber.
pub fn service(
    addr: &str,
) -> Result<
    (
        impl Iterator<Item = Result<String, Box<dyn Error>>>,
        impl FnMut(String) -> Result<(), Box<dyn Error>>,
    ),
    Box<dyn Error>,
> {
    let listener = TcpListener::bind(addr)?;
    let (case_producer, case_receiver) = mpsc::channel::<String>();
    let (model_producer, model_receiver) = mpsc::channel::<String>();
    spawn(move || start_server(listener, case_producer, model_receiver));
    Ok(streamer::channels(case_receiver, model_producer))
}

fn start_server(listener: TcpListener, case_producer: Sender<String>, model_receiver: Receiver<String>) {
    let peers: Peers = Arc::new(Mutex::new(vec![]));
    start_dispatcher(peers.clone(), model_receiver);
    start_websockets(listener, peers, case_producer);
}

fn start_websockets(listener: TcpListener, peers: Peers, case_producer: Sender<String>) {
    for stream in listener.incoming() {
        let peers = peers.clone();
        let case_producer = case_producer.clone();
        spawn(move || match get_websocket(stream) {
            Ok((path, websocket)) => {
                if path.ends_with("/ws/cases") {
                    handle_case_receiver(websocket, case_producer)
                } else if path.ends_with("/ws/clusters") {
                    handle_model_producer(websocket, peers)
                } else {
                    warn!("unknown endpoint {}", path);
                }
            }
            Err(reason) => warn!("websocket handshake failed: {}", reason),
        });
    }
}

fn get_websocket(
    stream: Result<TcpStream, std::io::Error>,
) -> Result<(String, WebSocket<TcpStream>), Box<dyn Error>> {
    let mut path: String = String::new();
    let callback = |req: &Request, response: Response| {
        path = String::from(req.uri().path());
        Ok(response)
    };
    let websocket = accept_hdr(stream?, callback).map_err(|e| e.to_string())?;
    Ok((path, websocket))
}

fn handle_model_producer(websocket: WebSocket<TcpStream>, peers: Peers) {
    match peers.lock() {
        Ok(mut peers) => peers.push(websocket),
        Err(reason) => warn!("subscriber rejected: {}", reason),
    }
}

fn handle_case_receiver(mut websocket: WebSocket<TcpStream>, case_producer: Sender<String>) {
    loop {
        match websocket.read_message() {
            Ok(message) => {
                if !read_case(message, &case_producer) {
                    break;
                }
            }
            Err(reason) => {
                debug!("case stream closed: {}", reason);
                break;
            }
        }
    }
}

fn read_case(message: Message, case_producer: &Sender<String>) -> bool {
    match message {
        Message::Text(txt) => case_producer.send(txt).is_ok(),
        Message::Binary(_) => {
            warn!("unsupported binary message.");
            true
        }
        Message::Close(_) => false,
        _ => true,
    }
}

fn start_dispatcher(peers: Peers, model_receiver: Receiver<String>) {
    spawn(move || {
        for msg in model_receiver {
            if let Ok(mut peers) = peers.lock() {
                peers.retain_mut(|peer| send_model(peer, msg.clone()));
            }
        }
    });
}

/// Sends a snapshot to a subscriber, `false` when the subscriber is gone and must be dropped.
fn send_model(peer: &mut WebSocket<TcpStream>, msg: String) -> bool {
    if !peer.can_write() {
        return false;
    }
    match peer.write_message(Message::Text(msg)) {
        Ok(()) => true,
        Err(reason) => {
            warn!("dropping subscriber: {}", reason);
            false
        }
    }
}
