use h1_oneshot::{Client, Error, Request, Response};
use std::thread;
use std::time::Duration;

fn handler(req: &Request, res: Result<Response, Error>) {
    match res {
        Ok(res) => {
            println!(
                "Request #{} has completed. Response: {}",
                req.id(),
                res.status_code()
            );
            println!("{}", String::from_utf8_lossy(res.body()));
        }
        Err(e) if e.is_cancelled() => {
            println!("Request #{} has been cancelled by the user.", req.id());
        }
        Err(e) => {
            println!("Request #{} failed! Error: {}", req.id(), e);
        }
    }
}

fn main() -> Result<(), std::io::Error> {
    pretty_env_logger::init();

    let client = Client::new()?;

    let mut request_one = client.create_request(1);
    request_one
        .set_host("localhost")
        .set_uri("/index.html")
        .set_port(3333)
        .set_callback(handler);
    request_one.execute();

    let mut request_two = client.create_request(2);
    request_two
        .set_host("localhost")
        .set_uri("/example.html")
        .set_port(3333)
        .set_callback(handler);
    request_two.execute();

    request_two.cancel();

    // let the first request complete.
    thread::sleep(Duration::from_secs(5));

    client.close();

    Ok(())
}
