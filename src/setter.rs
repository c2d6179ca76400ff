//! Bindings from a descriptor to one field of a command instance.
//!
//! A setter never owns the command. It stores plain `fn(&mut T) -> &mut Slot`
//! accessors and is handed the target for each assignment.

use crate::error::ConversionError;
use crate::handler::{DefaultHandler, FromToken, Handler};
use std::cell::{Cell, OnceCell};
use std::rc::Rc;

/// Shape of the field a setter writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// `bool`, set to `true` when the option is present.
    Flag,
    /// `V`, replaced on every assignment.
    Scalar,
    /// `Option<V>`, becomes `Some` on assignment.
    Boxed,
    /// `Vec<V>`, every assignment appends.
    Multi,
}

/// Writes converted tokens into one field of a `T`.
pub trait Setter<T> {
    /// Converts `token` and stores it on `target`. Flags ignore the token.
    fn assign(&self, target: &mut T, token: &str) -> Result<(), ConversionError>;

    fn kind(&self) -> SlotKind;

    fn is_multi_valued(&self) -> bool {
        self.kind() == SlotKind::Multi
    }
}

/// Handler picked on first use: the declared one if any, else the slot type's default.
pub(crate) struct LazyHandler<V> {
    explicit: Cell<Option<Rc<dyn Handler<V>>>>,
    fallback: Option<fn() -> Rc<dyn Handler<V>>>,
    resolved: OnceCell<Option<Rc<dyn Handler<V>>>>,
}

impl<V: 'static> LazyHandler<V> {
    pub(crate) fn with_default() -> Self
    where
        V: FromToken,
    {
        Self {
            explicit: Cell::new(None),
            fallback: Some(default_handler::<V>),
            resolved: OnceCell::new(),
        }
    }

    pub(crate) fn explicit(handler: impl Handler<V> + 'static) -> Self {
        let this = Self {
            explicit: Cell::new(None),
            fallback: None,
            resolved: OnceCell::new(),
        };
        this.replace(handler);
        this
    }

    pub(crate) fn replace(&self, handler: impl Handler<V> + 'static) {
        self.explicit.set(Some(Rc::new(handler)));
    }

    fn convert(&self, token: &str) -> Result<V, ConversionError> {
        let handler = self.resolved.get_or_init(|| {
            self.explicit
                .take()
                .or_else(|| self.fallback.map(|make| make()))
        });
        match handler {
            Some(handler) => handler.convert(token),
            None => Err(ConversionError::new(token, "no conversion declared for this value")),
        }
    }
}

fn default_handler<V: FromToken + 'static>() -> Rc<dyn Handler<V>> {
    Rc::new(DefaultHandler)
}

enum Access<T, V> {
    Scalar(fn(&mut T) -> &mut V),
    Boxed(fn(&mut T) -> &mut Option<V>),
    Multi(fn(&mut T) -> &mut Vec<V>),
}

/// Setter for any value slot: scalar, optional or list.
pub struct ValueSetter<T, V> {
    access: Access<T, V>,
    handler: LazyHandler<V>,
}

impl<T, V: 'static> ValueSetter<T, V> {
    pub(crate) fn scalar(access: fn(&mut T) -> &mut V, handler: LazyHandler<V>) -> Self {
        Self {
            access: Access::Scalar(access),
            handler,
        }
    }

    pub(crate) fn boxed(access: fn(&mut T) -> &mut Option<V>, handler: LazyHandler<V>) -> Self {
        Self {
            access: Access::Boxed(access),
            handler,
        }
    }

    pub(crate) fn multi(access: fn(&mut T) -> &mut Vec<V>, handler: LazyHandler<V>) -> Self {
        Self {
            access: Access::Multi(access),
            handler,
        }
    }

    pub(crate) fn set_handler(&self, handler: impl Handler<V> + 'static) {
        self.handler.replace(handler);
    }
}

impl<T, V: 'static> Setter<T> for ValueSetter<T, V> {
    fn assign(&self, target: &mut T, token: &str) -> Result<(), ConversionError> {
        let value = self.handler.convert(token)?;
        match &self.access {
            Access::Scalar(slot) => *slot(target) = value,
            Access::Boxed(slot) => *slot(target) = Some(value),
            Access::Multi(slot) => slot(target).push(value),
        }
        Ok(())
    }

    fn kind(&self) -> SlotKind {
        match self.access {
            Access::Scalar(_) => SlotKind::Scalar,
            Access::Boxed(_) => SlotKind::Boxed,
            Access::Multi(_) => SlotKind::Multi,
        }
    }
}

/// Setter for switches: any assignment sets the field to `true`.
pub struct FlagSetter<T> {
    access: fn(&mut T) -> &mut bool,
}

impl<T> FlagSetter<T> {
    pub(crate) fn new(access: fn(&mut T) -> &mut bool) -> Self {
        Self { access }
    }
}

impl<T> Setter<T> for FlagSetter<T> {
    fn assign(&self, target: &mut T, _token: &str) -> Result<(), ConversionError> {
        *(self.access)(target) = true;
        Ok(())
    }

    fn kind(&self) -> SlotKind {
        SlotKind::Flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct Target {
        verbose: bool,
        count: u32,
        limit: Option<Duration>,
        names: Vec<String>,
    }

    #[test]
    fn test_slots_store_by_kind() {
        let mut t = Target::default();

        let flag = FlagSetter::new(|t: &mut Target| &mut t.verbose);
        flag.assign(&mut t, "").unwrap();
        assert!(t.verbose);
        assert!(!flag.is_multi_valued());

        let count = ValueSetter::scalar(|t: &mut Target| &mut t.count, LazyHandler::with_default());
        count.assign(&mut t, "3").unwrap();
        count.assign(&mut t, "5").unwrap();
        assert_eq!(t.count, 5);

        let limit = ValueSetter::boxed(|t: &mut Target| &mut t.limit, LazyHandler::with_default());
        limit.assign(&mut t, "2s").unwrap();
        assert_eq!(t.limit, Some(Duration::from_secs(2)));
        assert_eq!(limit.kind(), SlotKind::Boxed);

        let names = ValueSetter::multi(|t: &mut Target| &mut t.names, LazyHandler::with_default());
        names.assign(&mut t, "a").unwrap();
        names.assign(&mut t, "b").unwrap();
        assert_eq!(t.names, vec!["a", "b"]);
        assert!(names.is_multi_valued());
    }

    #[test]
    fn test_explicit_handler_wins_over_default() {
        let mut t = Target::default();
        let count = ValueSetter::scalar(|t: &mut Target| &mut t.count, LazyHandler::with_default());
        count.set_handler(|token: &str| -> Result<u32, ConversionError> { Ok(token.len() as u32) });
        count.assign(&mut t, "abcd").unwrap();
        assert_eq!(t.count, 4);
    }

    #[test]
    fn test_handler_resolved_only_once() {
        let mut t = Target::default();
        let count = ValueSetter::scalar(|t: &mut Target| &mut t.count, LazyHandler::with_default());
        count.assign(&mut t, "1").unwrap();
        // already resolved to the default handler, later declarations do not apply
        count.set_handler(|_: &str| -> Result<u32, ConversionError> { Ok(99) });
        count.assign(&mut t, "2").unwrap();
        assert_eq!(t.count, 2);
    }

    #[test]
    fn test_conversion_failure_leaves_slot_untouched() {
        let mut t = Target {
            count: 7,
            ..Target::default()
        };
        let count = ValueSetter::scalar(|t: &mut Target| &mut t.count, LazyHandler::with_default());
        let err = count.assign(&mut t, "seven").unwrap_err();
        assert_eq!(err.token, "seven");
        assert_eq!(t.count, 7);
    }

    #[test]
    fn test_explicit_only_handler_for_custom_type() {
        #[derive(Debug, PartialEq)]
        struct Point(i32, i32);

        #[derive(Default)]
        struct Canvas {
            origin: Option<Point>,
        }

        let parse_point = |token: &str| -> Result<Point, ConversionError> {
            let (x, y) = token
                .split_once(',')
                .ok_or_else(|| ConversionError::new(token, "expected X,Y"))?;
            let x = x.parse().map_err(|_| ConversionError::new(token, "bad X"))?;
            let y = y.parse().map_err(|_| ConversionError::new(token, "bad Y"))?;
            Ok(Point(x, y))
        };
        let mut c = Canvas::default();
        let origin =
            ValueSetter::boxed(|c: &mut Canvas| &mut c.origin, LazyHandler::explicit(parse_point));
        origin.assign(&mut c, "3,4").unwrap();
        assert_eq!(c.origin, Some(Point(3, 4)));
        assert!(origin.assign(&mut c, "3").is_err());
    }
}
