use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use web_sys::{WebGl2RenderingContext, WebGlProgram, WebGlUniformLocation};

/// Cache of resolved uniform locations for the active program.
///
/// Uniform locations are scoped to one program generation: whenever the
/// active program changes, the cache is invalidated in full with
/// [`UniformCache::invalidate`]. Lookups that find no location are cached
/// too, so a uniform the shader does not declare costs a single GL query per
/// generation.
#[derive(Default)]
pub struct UniformCache {
    locations: HashMap<String, Option<WebGlUniformLocation>>,
    generation: u64,
}

impl UniformCache {
    /// Creates an empty uniform cache.
    pub fn new() -> UniformCache {
        UniformCache::default()
    }

    /// Drops all cached locations and rebinds the cache to a new generation.
    pub fn invalidate(&mut self, generation: u64) {
        self.locations.clear();
        self.generation = generation;
    }

    /// Resolves a uniform location, consulting the cache first.
    ///
    /// Returns `None` if the program does not declare the uniform (or if it
    /// was optimized out by the GLSL compiler).
    pub fn resolve(
        &mut self,
        gl: &WebGl2RenderingContext,
        program: &WebGlProgram,
        name: &str,
    ) -> Option<WebGlUniformLocation> {
        self.locations
            .entry(name.to_string())
            .or_insert_with(|| gl.get_uniform_location(program, name))
            .clone()
    }

    /// Sets a typed uniform value.
    ///
    /// A uniform the shader does not declare is a silent no-op.
    pub fn set<T: UniformType>(
        &mut self,
        gl: &WebGl2RenderingContext,
        program: &WebGlProgram,
        name: &str,
        value: T,
    ) {
        if let Some(location) = self.resolve(gl, program, name) {
            value.uniform(gl, Some(&location));
        }
    }

    /// Sets a float uniform from a dynamically sized value list.
    ///
    /// Dispatches to `uniform1f`..`uniform4f` according to the number of
    /// values. A value count outside 1..=4 violates the caller contract and
    /// is rejected with an error; an undeclared uniform is a silent no-op.
    pub fn set_floats(
        &mut self,
        gl: &WebGl2RenderingContext,
        program: &WebGlProgram,
        name: &str,
        values: &[f32],
    ) -> Result<(), JsValue> {
        validate_component_count(values.len()).map_err(JsValue::from)?;
        let Some(location) = self.resolve(gl, program, name) else {
            return Ok(());
        };
        let location = Some(&location);
        match *values {
            [x] => gl.uniform1f(location, x),
            [x, y] => gl.uniform2f(location, x, y),
            [x, y, z] => gl.uniform3f(location, x, y, z),
            [x, y, z, w] => gl.uniform4f(location, x, y, z, w),
            _ => unreachable!(),
        }
        Ok(())
    }
}

pub(crate) fn validate_component_count(n: usize) -> Result<(), String> {
    if (1..=4).contains(&n) {
        Ok(())
    } else {
        Err(format!("uniform value must have 1 to 4 components, got {n}"))
    }
}

/// Trait that links native Rust types with WebGL2 uniform types.
pub trait UniformType {
    /// Sets the value of the uniform.
    ///
    /// This function sets the value of the WebGL2 uniform in `location` to
    /// the value of `self` using one of the `uniform{1,2,3,4}f` WebGL2
    /// functions as appropriate.
    fn uniform(&self, gl: &WebGl2RenderingContext, location: Option<&WebGlUniformLocation>);
}

macro_rules! impl_uniform {
    ($t:ty, $fun:ident, $sel:ident, $($things:expr),+) => {
        #[doc = concat!("Uniform type corresponding to `", stringify!($fun), "`.")]
	impl UniformType for $t {
	    fn uniform(&$sel, gl: &WebGl2RenderingContext, location: Option<&WebGlUniformLocation>) {
		gl.$fun(location, $($things,)+)
	    }
	}
    }
}

impl_uniform!(f32, uniform1f, self, *self);
impl_uniform!((f32, f32), uniform2f, self, self.0, self.1);
impl_uniform!((f32, f32, f32), uniform3f, self, self.0, self.1, self.2);
impl_uniform!(
    (f32, f32, f32, f32),
    uniform4f,
    self,
    self.0,
    self.1,
    self.2,
    self.3
);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn component_count_validation() {
        assert!(validate_component_count(0).is_err());
        for n in 1..=4 {
            assert!(validate_component_count(n).is_ok());
        }
        assert!(validate_component_count(5).is_err());
    }
}
