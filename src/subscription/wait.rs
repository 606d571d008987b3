use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io;
use std::os::fd::BorrowedFd;
use tracing::trace;

/// Outcome of a blocking readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The subscription descriptor has pending data
    Ready,
    /// The cancellation descriptor fired
    Cancelled,
}

/// Block until `fd` is readable or `cancel` fires. No timeout.
///
/// Interrupted waits are restarted. Cancellation wins when both descriptors
/// are ready at once. An error condition on the subscription descriptor is
/// reported as `Ready` so the next receive consumes it; a hangup or invalid
/// descriptor is an error.
pub fn wait_readable(fd: BorrowedFd<'_>, cancel: Option<BorrowedFd<'_>>) -> io::Result<Readiness> {
    loop {
        let mut fds = Vec::with_capacity(2);
        fds.push(PollFd::new(fd, PollFlags::POLLIN));
        if let Some(cancel) = cancel {
            fds.push(PollFd::new(cancel, PollFlags::POLLIN));
        }

        match poll(&mut fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(Errno::EINTR) => {
                trace!("readiness wait interrupted, restarting");
                continue;
            }
            Err(errno) => return Err(io::Error::from(errno)),
        }

        if let Some(cancel_fd) = fds.get(1) {
            if fired(cancel_fd, PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR) {
                return Ok(Readiness::Cancelled);
            }
        }

        if fired(&fds[0], PollFlags::POLLNVAL | PollFlags::POLLHUP) {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "subscription descriptor closed",
            ));
        }

        if fired(&fds[0], PollFlags::POLLIN | PollFlags::POLLERR) {
            return Ok(Readiness::Ready);
        }
    }
}

fn fired(fd: &PollFd<'_>, mask: PollFlags) -> bool {
    fd.revents().is_some_and(|revents| revents.intersects(mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::pthread::{pthread_kill, pthread_self};
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
    use std::io::Write;
    use std::os::fd::AsFd;
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    static SIGNALS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn count_signal(_: std::ffi::c_int) {
        SIGNALS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_ready_when_data_pending() {
        let (mut tx, rx) = UnixStream::pair().unwrap();
        tx.write_all(&[1]).unwrap();

        assert_eq!(wait_readable(rx.as_fd(), None).unwrap(), Readiness::Ready);
    }

    #[test]
    fn test_blocks_until_data_arrives() {
        let (mut tx, rx) = UnixStream::pair().unwrap();

        let writer = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(30));
            tx.write_all(&[1]).unwrap();
            tx
        });

        let started = std::time::Instant::now();
        assert_eq!(wait_readable(rx.as_fd(), None).unwrap(), Readiness::Ready);
        assert!(started.elapsed() >= std::time::Duration::from_millis(20));
        writer.join().unwrap();
    }

    #[test]
    fn test_hangup_is_error() {
        let (tx, rx) = UnixStream::pair().unwrap();
        drop(tx);

        let err = wait_readable(rx.as_fd(), None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_interrupted_wait_keeps_blocking() {
        let action = SigAction::new(
            SigHandler::Handler(count_signal),
            SaFlags::empty(),
            SigSet::empty(),
        );
        // SAFETY: the handler only touches an atomic
        unsafe { sigaction(Signal::SIGUSR1, &action) }.unwrap();

        let (mut tx, rx) = UnixStream::pair().unwrap();
        let (thread_tx, thread_rx) = std::sync::mpsc::channel();
        let waiter = std::thread::spawn(move || {
            thread_tx.send(pthread_self()).unwrap();
            wait_readable(rx.as_fd(), None)
        });

        let thread = thread_rx.recv().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        pthread_kill(thread, Signal::SIGUSR1).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(SIGNALS.load(Ordering::SeqCst) >= 1);
        assert!(!waiter.is_finished());

        tx.write_all(&[1]).unwrap();
        assert_eq!(waiter.join().unwrap().unwrap(), Readiness::Ready);
    }
}
