//! CONNECT tunnels.
//!
//! After the target is dialed the client gets a single success line and the
//! connection turns into an opaque byte relay. The proxy never looks at the
//! tunneled bytes.

use crate::access_log::Status;
use crate::dial::dial;
use crate::pipeline::Session;
use crate::relay::relay;
use crate::request::Request;
use crate::resolver::Target;
use crate::response::{send_error, CONNECT_ESTABLISHED};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

pub(crate) async fn open_tunnel<S>(
    session: &Session<'_>,
    mut client: BufReader<S>,
    request: &Request,
    target: &Target,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let upstream = match dial(target, session.connect_timeout).await {
        Ok(stream) => stream,
        Err(e) => {
            session.log(&target.host, &request.method, Status::Error, e.to_string());
            send_error(&mut client, 502, "Bad Gateway").await;
            return;
        }
    };

    let replied = match client.write_all(CONNECT_ESTABLISHED).await {
        Ok(()) => client.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = replied {
        debug!(addr = %target, error = %e, "Client went away before tunnel reply");
        session.log(
            &target.host,
            &request.method,
            Status::Error,
            "Failed to send response",
        );
        return;
    }

    session.log(&target.host, &request.method, Status::Ok, "Tunnel established");

    let stats = relay(client, upstream).await;
    debug!(
        addr = %target,
        sent = stats.a_to_b,
        received = stats.b_to_a,
        "Tunnel closed"
    );
}
