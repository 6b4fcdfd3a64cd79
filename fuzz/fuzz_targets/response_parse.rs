#![no_main]
use libfuzzer_sys::fuzz_target;

use async_std::io::Cursor;
use h1_oneshot::buf_reader::BufIo;
use h1_oneshot::http11::{HeaderLine, ResponseParser, CRLF};

fuzz_target!(|data: &[u8]| {
    let stream = Cursor::new(data.to_vec());

    async_std::task::block_on(async move {
        let mut io = BufIo::with_capacity(64, stream);
        let mut parser = ResponseParser::new();

        let line = match io.read_until(CRLF).await {
            Ok(v) => v,
            Err(_) => return,
        };

        if parser.parse_status_line(&line).is_err() {
            return;
        }

        loop {
            let line = match io.read_until(CRLF).await {
                Ok(v) => v,
                Err(_) => return,
            };

            if parser.parse_header_line(&line) == HeaderLine::End {
                break;
            }
        }

        if let Ok(body) = io.read_to_end().await {
            parser.push_body(&body);
            let _ = parser.into_response();
        }
    });
});
