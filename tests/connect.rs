use async_std::net::TcpListener;
use h1_oneshot::connect::{connect, resolve};
use std::io;
use std::net::SocketAddr;

mod common;

fn local(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

#[async_std::test]
async fn first_accepting_candidate_wins() -> io::Result<()> {
    common::setup_logger();

    let l = TcpListener::bind("127.0.0.1:0").await?;
    let listening = l.local_addr()?;

    let closed = local(common::closed_port());

    let tcp = connect(&[closed, listening]).await?;

    assert_eq!(tcp.peer_addr()?, listening);

    Ok(())
}

#[async_std::test]
async fn earlier_candidate_preferred() -> io::Result<()> {
    let l_1 = TcpListener::bind("127.0.0.1:0").await?;
    let l_2 = TcpListener::bind("127.0.0.1:0").await?;

    let addr_1 = l_1.local_addr()?;
    let addr_2 = l_2.local_addr()?;

    let tcp = connect(&[addr_2, addr_1]).await?;
    assert_eq!(tcp.peer_addr()?, addr_2);

    let tcp = connect(&[addr_1, addr_2]).await?;
    assert_eq!(tcp.peer_addr()?, addr_1);

    Ok(())
}

#[async_std::test]
async fn all_candidates_refused() {
    let closed_a = local(common::closed_port());
    let closed_b = local(common::closed_port());

    let err = connect(&[closed_a, closed_b]).await.unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
}

#[async_std::test]
async fn no_candidates() {
    let err = connect(&[]).await.unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    assert_eq!(err.to_string(), "No candidates to connect to");
}

#[async_std::test]
async fn resolve_address_literal() -> io::Result<()> {
    let addrs = resolve("127.0.0.1", 8080).await?;

    assert_eq!(addrs, vec![local(8080)]);

    Ok(())
}

#[async_std::test]
async fn resolve_unknown_host() {
    let res = resolve("no-such-host.invalid", 80).await;

    assert!(res.is_err());
}
