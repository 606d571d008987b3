use std::io::{self, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::sync::Arc;

/// Create a linked cancellation pair.
///
/// The token side is a second wakeable descriptor that the event loop polls
/// next to the subscription; the canceller wakes it from any thread.
pub fn cancel_pair() -> io::Result<(Canceller, CancelToken)> {
    let (tx, rx) = UnixStream::pair()?;
    tx.set_nonblocking(true)?;
    rx.set_nonblocking(true)?;

    Ok((Canceller { tx: Arc::new(tx) }, CancelToken { rx }))
}

/// Sending half; cloneable and usable from signal-handling tasks
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: Arc<UnixStream>,
}

impl Canceller {
    /// Wake the paired token. Repeated calls are harmless.
    pub fn cancel(&self) -> io::Result<()> {
        match (&*self.tx).write(&[1]) {
            Ok(_) => Ok(()),
            // buffer already holds a wakeup
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Receiving half, owned by the event loop
#[derive(Debug)]
pub struct CancelToken {
    rx: UnixStream,
}

impl AsFd for CancelToken {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.rx.as_fd()
    }
}
