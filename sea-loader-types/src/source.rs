use crate::{DataHeaders, LogicalPoint, Point};

/// A sequential source of decoded points.
pub trait DataSource {
    type Error: std::error::Error;

    /// Returns the next point, or `None` at the end of stream.
    /// Any error is fatal; the caller must not call this again after an error.
    fn next_item(&mut self) -> Result<Option<LogicalPoint>, Self::Error>;

    /// Optional description of the stream.
    fn headers(&self) -> Option<DataHeaders> {
        None
    }
}

/// Produces the logical point stream. Implementations usually simulate a fleet of hosts.
pub trait Simulator {
    /// Whether all points have been generated.
    fn finished(&self) -> bool;

    /// Advance to the next state and write it into `point`, overwriting its content.
    /// Returns false if there is nothing to write.
    fn next(&mut self, point: &mut Point) -> bool;

    fn headers(&self) -> DataHeaders;
}

impl<S: DataSource + ?Sized> DataSource for &mut S {
    type Error = S::Error;

    fn next_item(&mut self) -> Result<Option<LogicalPoint>, Self::Error> {
        (**self).next_item()
    }

    fn headers(&self) -> Option<DataHeaders> {
        (**self).headers()
    }
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    type Error = S::Error;

    fn next_item(&mut self) -> Result<Option<LogicalPoint>, Self::Error> {
        (**self).next_item()
    }

    fn headers(&self) -> Option<DataHeaders> {
        (**self).headers()
    }
}
