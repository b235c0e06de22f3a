use std::fmt::Formatter;

use thiserror::Error;

use crate::scheduler::state::StateId;

/// An error that is localised to the execution state that raised it.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The execution state in which the error occurred.
    pub location: StateId,

    /// The error data
    pub payload: E,
}

/// Displays the error prefixed by the execution state where it occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[state {}]: {}", self.location, self.payload)
    }
}

/// A trait for types that can have an execution state location attached to
/// them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached location.
    type Located;

    /// Attach the execution state described by `state` to the error.
    fn locate(self, state: StateId) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, state: StateId) -> Self::Located {
        self.map_err(|e| Located {
            location: state,
            payload:  e,
        })
    }
}

/// An error that is a collection of errors.
///
/// The order of the errors in the container is the order in which they were
/// added, which for the scheduler is the order in which they were raised.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Errors<E> {
    payloads: Vec<E>,
}

impl<E> Errors<E> {
    /// Creates a new container for errors.
    #[must_use]
    pub fn new() -> Self {
        let payloads = vec![];
        Self { payloads }
    }

    /// Gets the errors contained within this error.
    #[must_use]
    pub fn payloads(&self) -> &[E] {
        self.payloads.as_slice()
    }

    /// Gets the length of the errors container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Checks if the errors container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Errors<E>
where
    E: std::error::Error,
{
    /// Adds the provided `error` to the container.
    pub fn add(&mut self, error: E) {
        self.payloads.push(error);
    }

    /// Adds the multiple provided errors to the container.
    pub fn add_many(&mut self, errors: impl Into<Vec<E>>) {
        self.payloads.extend(errors.into());
    }
}

impl<E> Errors<Located<E>>
where
    E: std::error::Error + Clone,
{
    /// Adds an error `payload` raised by the execution state `state`.
    pub fn add_located(&mut self, state: StateId, payload: E) {
        let error = Located {
            location: state,
            payload,
        };
        self.payloads.push(error);
    }

    /// Gets the errors raised by the execution state `state`, in the order in
    /// which they were raised.
    #[must_use]
    pub fn raised_by(&self, state: StateId) -> Vec<&Located<E>> {
        self.payloads.iter().filter(|e| e.location == state).collect()
    }
}

/// The default errors container is one containing no errors.
impl<E> Default for Errors<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Allow conversion from any error type to a container of errors.
impl<E> From<E> for Errors<E>
where
    E: std::error::Error,
{
    fn from(value: E) -> Self {
        let mut errors = Self::default();
        errors.add(value);
        errors
    }
}

/// Allow conversion from the errors container to a vector of errors.
impl<E> From<Errors<E>> for Vec<E>
where
    E: std::error::Error,
{
    fn from(value: Errors<E>) -> Self {
        value.payloads
    }
}

/// Allow conversion from a vector of errors to the errors container.
impl<E> From<Vec<E>> for Errors<E>
where
    E: std::error::Error,
{
    fn from(value: Vec<E>) -> Self {
        Self { payloads: value }
    }
}

/// Displays the errors in the sequence in which they occur in the container.
///
/// It has a header specifying how many errors occurred, and then prints one
/// error per line after that. This means that in the case where errors did
/// occur, the output of `fmt` is multi-line.
impl<E> std::fmt::Display for Errors<E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.payloads.is_empty() {
            write!(f, "Encountered no errors")?;
        } else {
            writeln!(f, "Encountered {} errors:", self.payloads.len())?;
            for error in &self.payloads {
                writeln!(f, "{error}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::{
            container::{Errors, Locatable, Located},
            execution::Error,
        },
        scheduler::state::StateId,
    };

    #[test]
    fn can_locate_results() {
        let result: Result<(), Error> = Err(Error::SelfDependency);
        let located = result.locate(StateId::new(3));

        assert_eq!(
            located,
            Err(Located {
                location: StateId::new(3),
                payload:  Error::SelfDependency,
            })
        );
    }

    #[test]
    fn filters_errors_by_raising_state() {
        let mut errors: Errors<Located<Error>> = Errors::new();
        errors.add_located(StateId::new(1), Error::SelfDependency);
        errors.add_located(StateId::new(0), Error::InvalidCycleCount { requested: 0 });
        errors.add_located(StateId::new(1), Error::UnimplementedPrimitive {
            name: "wait_posedge".into(),
        });

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.raised_by(StateId::new(1)).len(), 2);
        assert_eq!(errors.raised_by(StateId::new(2)).len(), 0);

        // Insertion order is kept rather than being sorted by location.
        assert_eq!(errors.payloads()[0].location, StateId::new(1));
    }

    #[test]
    fn displays_one_error_per_line() {
        let mut errors: Errors<Located<Error>> = Errors::new();
        assert_eq!(errors.to_string(), "Encountered no errors");

        errors.add_located(StateId::new(2), Error::SelfDependency);
        let text = errors.to_string();
        assert!(text.starts_with("Encountered 1 errors:"));
        assert!(text.contains("[state #2]"));
    }
}
