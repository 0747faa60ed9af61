#[macro_use]
extern crate log;

use std::io;

use clap::Parser;
use mio::net::UdpSocket;

use udp4_net::establish;
use udp4_net::MtuCell;
use udp4_net::NetConfig;
use udp4_net::SocketRequest;

static MTU: MtuCell = MtuCell::new();

#[derive(Parser)]
struct Args {
    /// Address to bind. Empty binds every interface and accepts
    /// broadcast; a class D address joins that multicast group.
    #[clap(short = 'b', long = "bind", default_value = "")]
    bind_addr: String,

    /// Port to bind.
    #[clap(short = 'p', long = "port", default_value = "5004")]
    bind_port: u16,

    /// Remote peer address, or the source to filter a multicast join on.
    #[clap(short = 's', long = "server", default_value = "")]
    server_addr: String,

    /// Remote peer port.
    #[clap(long = "server-port", default_value = "5004")]
    server_port: u16,

    /// Multicast time-to-live; 0 keeps the configured default.
    #[clap(long, default_value = "0")]
    ttl: i32,

    /// Outbound multicast interface address.
    #[clap(long = "miface-addr")]
    miface_addr: Option<String>,
}

fn main() {
    env_logger::builder()
        .default_format_timestamp_nanos(true)
        .init();

    let args = Args::parse();

    let req = SocketRequest {
        bind_addr: args.bind_addr,
        bind_port: args.bind_port,
        server_addr: args.server_addr,
        server_port: args.server_port,
        ttl: args.ttl,
        miface_addr: args.miface_addr,
    };

    let out = match establish(&req, &NetConfig::default(), &MTU) {
        Ok(v) => v,

        Err(e) => {
            error!("cannot open socket: {}", e);
            std::process::exit(1);
        },
    };

    info!(
        "socket ready on {:?}, mtu {}",
        out.socket.local_addr(),
        out.mtu
    );

    out.socket.set_nonblocking(true).unwrap();
    let mut socket = UdpSocket::from_std(out.socket);

    let mut poll = mio::Poll::new().unwrap();
    let mut events = mio::Events::with_capacity(1024);

    poll.registry()
        .register(&mut socket, mio::Token(0), mio::Interest::READABLE)
        .unwrap();

    let mut buf = vec![0u8; out.mtu as usize];

    loop {
        poll.poll(&mut events, None).unwrap();

        loop {
            match socket.recv_from(&mut buf) {
                Ok((len, from)) => println!("{} bytes from {}", len, from),

                Err(e) => {
                    if e.kind() == io::ErrorKind::WouldBlock {
                        break;
                    }

                    panic!("recv error: {:?}", e);
                },
            }
        }
    }
}
