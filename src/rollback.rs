//! Releasing the GL objects of a half-built resource when a later creation
//! step fails.

use crate::buffer::{Buffer, VertexArray};
use crate::error::Result;
use crate::framebuffer::Framebuffer;
use crate::model::Model;
use crate::shaders::Shader;
use crate::texture::Texture;

/// A GL object that can delete itself.
pub(crate) trait Release<C> {
    /// Delete the object.
    ///
    /// # Safety
    ///
    /// `gl` must be the current context the object was created with.
    unsafe fn release(&self, gl: &C);
}

macro_rules! release_via_destroy {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Release<glow::Context> for $ty {
                unsafe fn release(&self, gl: &glow::Context) {
                    unsafe { self.destroy(gl) }
                }
            }
        )*
    };
}

release_via_destroy!(Buffer, VertexArray, Framebuffer, Model, Shader, Texture);

/// Objects created so far by a multi-step constructor. They are released in
/// reverse order as soon as a later step fails.
pub(crate) struct Rollback<'a, C> {
    gl: &'a C,
    created: Vec<&'a dyn Release<C>>,
}

impl<'a, C> Rollback<'a, C> {
    pub(crate) fn new(gl: &'a C) -> Self {
        Self {
            gl,
            created: Vec::new(),
        }
    }

    /// Track `object` for release on a later failure.
    pub(crate) fn push(&mut self, object: &'a dyn Release<C>) {
        self.created.push(object);
    }

    /// Pass `result` through, releasing everything tracked so far if it is
    /// an error.
    ///
    /// # Safety
    ///
    /// The context must be current, and tracked objects must not be used
    /// after an error is returned.
    pub(crate) unsafe fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            log::debug!("releasing {} partially created object(s)", self.created.len());
            for object in self.created.drain(..).rev() {
                unsafe { object.release(self.gl) };
            }
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::GfxError;

    struct Tracked<'a> {
        id: u32,
        released: &'a RefCell<Vec<u32>>,
    }

    impl Release<()> for Tracked<'_> {
        unsafe fn release(&self, _gl: &()) {
            self.released.borrow_mut().push(self.id);
        }
    }

    #[test]
    fn success_releases_nothing() {
        let released = RefCell::new(Vec::new());
        let first = Tracked {
            id: 1,
            released: &released,
        };
        let mut rollback = Rollback::new(&());
        rollback.push(&first);
        let value = unsafe { rollback.check(Ok(5_u8)) }.unwrap();
        assert_eq!(value, 5);
        assert!(released.borrow().is_empty());
    }

    #[test]
    fn failure_releases_created_objects_in_reverse() {
        let released = RefCell::new(Vec::new());
        let first = Tracked {
            id: 1,
            released: &released,
        };
        let second = Tracked {
            id: 2,
            released: &released,
        };
        let mut rollback = Rollback::new(&());
        rollback.push(&first);
        rollback.push(&second);

        let result = unsafe { rollback.check::<u8>(Err(GfxError::Gl("out of memory".into()))) };
        assert!(matches!(result, Err(GfxError::Gl(_))));
        assert_eq!(*released.borrow(), [2, 1]);

        let again = unsafe { rollback.check::<u8>(Err(GfxError::NoPickAttachment)) };
        assert!(again.is_err());
        assert_eq!(*released.borrow(), [2, 1]);
    }
}
