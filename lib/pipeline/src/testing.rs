//! Instrumented backends for unit tests

use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vecflow_core::{Backend, BackendError, BackendRegistry, Features, Matrix, ParamReader, Params};

#[derive(Debug, Default)]
pub(crate) struct Recorder {
    constructed: AtomicUsize,
    fits: AtomicUsize,
}

impl Recorder {
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn fits(&self) -> usize {
        self.fits.load(Ordering::SeqCst)
    }
}

/// Emits `width` columns filled with `fill`, one row per input row
struct Constant {
    width: usize,
    fill: f32,
}

impl Backend for Constant {
    fn name(&self) -> &str {
        "constant"
    }

    fn is_trainable(&self) -> bool {
        false
    }

    fn fit(&mut self, _data: &Features, _labels: Option<&[Value]>) -> Result<(), BackendError> {
        Ok(())
    }

    fn transform(&self, data: &Features) -> Result<Features, BackendError> {
        let rows = data.n_rows();
        Matrix::new(vec![self.fill; rows * self.width], rows, self.width).map(Features::from)
    }
}

/// Trainable identity on dense input; counts fits
struct Counting {
    recorder: Arc<Recorder>,
    fitted: bool,
}

impl Backend for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn is_trainable(&self) -> bool {
        true
    }

    fn fit(&mut self, data: &Features, _labels: Option<&[Value]>) -> Result<(), BackendError> {
        data.as_dense()?;
        self.recorder.fits.fetch_add(1, Ordering::SeqCst);
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, data: &Features) -> Result<Features, BackendError> {
        if !self.fitted {
            return Err(BackendError::NotFitted);
        }
        Ok(Features::Dense(data.as_dense()?.clone()))
    }
}

/// Trainable backend whose fit always fails
struct Failing;

impl Backend for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn is_trainable(&self) -> bool {
        true
    }

    fn fit(&mut self, _data: &Features, _labels: Option<&[Value]>) -> Result<(), BackendError> {
        Err(BackendError::InvalidInput("refusing to fit".to_string()))
    }

    fn transform(&self, _data: &Features) -> Result<Features, BackendError> {
        Err(BackendError::NotFitted)
    }
}

/// Registry with `constant`, `counting` and `failing`, all reporting to `recorder`
pub(crate) fn registry(recorder: &Arc<Recorder>) -> BackendRegistry {
    let on_constant = Arc::clone(recorder);
    let on_counting = Arc::clone(recorder);
    let on_failing = Arc::clone(recorder);
    BackendRegistry::new()
        .with("constant", move |params: &Params| {
            let reader = ParamReader::new(params, &["width", "fill"])?;
            let width = reader.usize("width", 1)?;
            let fill = reader.usize("fill", 1)? as f32;
            on_constant.constructed.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Constant { width, fill }) as Box<dyn Backend>)
        })
        .with("counting", move |params: &Params| {
            ParamReader::new(params, &["tag"])?;
            on_counting.constructed.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Counting {
                recorder: Arc::clone(&on_counting),
                fitted: false,
            }) as Box<dyn Backend>)
        })
        .with("failing", move |params: &Params| {
            ParamReader::new(params, &[])?;
            on_failing.constructed.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Failing) as Box<dyn Backend>)
        })
}
