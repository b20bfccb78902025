//! Durability hook for container sinks.
//!
//! Writers are generic over their output. `Durable` lets them request an
//! fsync from file-backed sinks while in-memory sinks treat it as a no-op.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Write};

/// A sink whose written bytes can be forced to stable storage
pub trait Durable {
    /// Force buffered data to stable storage
    fn sync(&mut self) -> io::Result<()>;
}

impl Durable for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl<W: Write + Durable> Durable for BufWriter<W> {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().sync()
    }
}

impl<T> Durable for Cursor<T> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Durable for Vec<u8> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<D: Durable + ?Sized> Durable for &mut D {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}
