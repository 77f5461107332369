/// The shape of the target stored in a [`Callable`][crate::Callable].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CallableKind {
    /// A free function pointer.
    Function,

    /// A method bound to an object that the callable owns by value.
    OwnedMethod,

    /// A method bound to an object that the callable references without owning it.
    BorrowedMethod,

    /// A method bound to an object whose lifetime is extended through shared ownership.
    SharedMethod,

    /// Any other functor or closure.
    Closure,
}

/// Identity information about the target of a [`Callable`][crate::Callable].
///
/// Two callables that report the same identifiable target invoke the same code on the same
/// object. This can be used to detect duplicate registrations of a function pointer or of a
/// method on a specific object.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CallableInfo {
    kind: CallableKind,
    object: Option<usize>,
    target: Option<usize>,
}

impl CallableInfo {
    pub(crate) const fn new(kind: CallableKind, object: Option<usize>, target: Option<usize>) -> Self {
        Self {
            kind,
            object,
            target,
        }
    }

    /// The shape of the stored target.
    #[must_use]
    pub const fn kind(&self) -> CallableKind {
        self.kind
    }

    /// Address of the object a method is bound to, if the object lives outside the callable.
    ///
    /// This is `None` for free functions, closures and owned methods (an owned object moves
    /// together with the callable, so its address is not a stable identity).
    #[must_use]
    pub const fn object(&self) -> Option<usize> {
        self.object
    }

    /// Address of the function or method pointer, if the target has one.
    #[must_use]
    pub const fn target(&self) -> Option<usize> {
        self.target
    }

    /// Whether two targets are known to be the same code bound to the same object.
    ///
    /// Closures and owned methods have no stable identity and never compare as the same target,
    /// not even with themselves.
    #[must_use]
    pub fn is_same_target(&self, other: &Self) -> bool {
        let identifiable = matches!(
            self.kind,
            CallableKind::Function | CallableKind::BorrowedMethod | CallableKind::SharedMethod
        );

        identifiable
            && self.kind == other.kind
            && self.target.is_some()
            && self.target == other.target
            && self.object == other.object
    }
}
