//! Type-erased resource handles (spec §4.F): `Resource::from(r)` copies the
//! handle, `R::try_from(resource)` only succeeds if the kinds match. Kept
//! separate from [`crate::registries::RegistryHub`], which does the actual
//! per-kind dispatch once a `Resource` reaches it.

use crate::handle::{Handle, ResourceKind};
use std::convert::TryFrom;
use std::fmt;

/// A handle to any resource kind, with its type erased.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resource {
    handle: Handle,
}

impl Resource {
    pub fn from_handle(handle: Handle) -> Self {
        Resource { handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        crate::handle::kind(self.handle)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.handle.fmt(f)
    }
}

/// A handle whose kind is known at compile time. Implemented by every
/// per-kind newtype below; `Resource` and these types convert into each
/// other through it.
pub trait TypedResource: Copy {
    const KIND: ResourceKind;

    fn handle(&self) -> Handle;
    fn from_handle_unchecked(handle: Handle) -> Self;
}

impl<R: TypedResource> From<R> for Resource {
    fn from(r: R) -> Resource {
        Resource::from_handle(r.handle())
    }
}

impl<R: TypedResource> TryFrom<Resource> for R {
    type Error = Resource;

    fn try_from(resource: Resource) -> Result<R, Resource> {
        if resource.kind() == Some(R::KIND) {
            Ok(R::from_handle_unchecked(resource.handle))
        } else {
            Err(resource)
        }
    }
}

macro_rules! typed_resource {
    ($name:ident, $kind:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        #[repr(transparent)]
        pub struct $name(Handle);

        impl TypedResource for $name {
            const KIND: ResourceKind = $kind;

            fn handle(&self) -> Handle {
                self.0
            }

            fn from_handle_unchecked(handle: Handle) -> Self {
                $name(handle)
            }
        }
    };
}

typed_resource!(Buffer, ResourceKind::Buffer);
typed_resource!(Texture, ResourceKind::Texture);
typed_resource!(Heap, ResourceKind::Heap);
typed_resource!(ArgumentBuffer, ResourceKind::ArgumentBuffer);
typed_resource!(ArgumentBufferArray, ResourceKind::ArgumentBufferArray);
typed_resource!(VisibleFunctionTable, ResourceKind::VisibleFunctionTable);
typed_resource!(IntersectionFunctionTable, ResourceKind::IntersectionFunctionTable);
typed_resource!(AccelerationStructure, ResourceKind::AccelerationStructure);
typed_resource!(HazardTrackingGroup, ResourceKind::HazardTrackingGroup);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_from_succeeds_only_for_the_matching_kind() {
        let h = crate::handle::pack(ResourceKind::Texture, crate::handle::HandleFlags::PERSISTENT, 0, 0, 5);
        let resource = Resource::from_handle(h);
        assert!(Texture::try_from(resource).is_ok());
        assert!(Buffer::try_from(resource).is_err());
    }

    #[test]
    fn from_typed_resource_round_trips_the_handle() {
        let h = crate::handle::pack(ResourceKind::Buffer, crate::handle::HandleFlags::empty(), 2, 1, 9);
        let buffer = Buffer::from_handle_unchecked(h);
        let resource: Resource = buffer.into();
        assert_eq!(resource.handle(), h);
    }
}
