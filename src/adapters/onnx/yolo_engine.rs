use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use image::RgbImage;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::adapters::onnx::postprocess::{decode_candidates, head_output, non_maximum_suppression};
use crate::adapters::onnx::preprocess::letterbox;
use crate::application::ports::DetectorPort;
use crate::domain::{
    detection::{RawBox, ResultSet},
    errors::{DomainError, DomainResult},
    labels::LabelSet,
    model::{Device, InferenceConfig, YoloParams},
};

/// Detector YOLOv8 sobre una sesión de ONNX Runtime. Clonarlo es barato: los clones
/// comparten la sesión.
#[derive(Clone)]
pub struct OnnxYoloEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    // `Session::run` exige `&mut self`.
    session: Mutex<Session>,
    labels: Arc<LabelSet>,
    params: YoloParams,
}

impl OnnxYoloEngine {
    pub fn load(cfg: &InferenceConfig) -> Result<Self> {
        let path = &cfg.model.onnx_path;
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(cfg.intra_threads)?;

        match cfg.device {
            Device::Cpu => {
                builder = builder.with_execution_providers([CPUExecutionProvider::default().build()])?;
            }
            Device::Cuda => {
                // Si CUDA no se puede registrar seguimos en CPU.
                match builder.clone().with_execution_providers([cuda_provider()]) {
                    Ok(with_cuda) => builder = with_cuda,
                    Err(e) => warn!("⚠️ CUDA no disponible, se continúa en CPU: {e}"),
                }
            }
        }

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("loading ONNX model {path}"))?;

        let labels = match session.metadata().ok().and_then(|m| m.custom("names").ok().flatten()) {
            Some(raw) => LabelSet::from_metadata(&raw).unwrap_or_else(|e| {
                warn!("{e}; se usan las etiquetas COCO");
                LabelSet::coco()
            }),
            None => LabelSet::coco(),
        };

        info!(
            model = %cfg.model.name,
            device = %cfg.device,
            classes = labels.len(),
            input_size = cfg.params.input_size,
            "✅ Detector cargado"
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                session: Mutex::new(session),
                labels: Arc::new(labels),
                params: cfg.params.clone(),
            }),
        })
    }
}

/// Proveedor CUDA que devuelve error si no se registra, en lugar de solo avisar.
fn cuda_provider() -> ExecutionProviderDispatch {
    CUDAExecutionProvider::default().build().error_on_failure()
}

impl EngineInner {
    fn infer(&self, rgb: &RgbImage) -> Result<Vec<RawBox>> {
        let imgsz = self.params.input_size;
        let (input, geometry) = letterbox(rgb, imgsz);

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Tensor::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("detector session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        let view = head_output(&dims, data_out)?;

        let candidates = decode_candidates(view, self.params.conf_threshold);
        debug!(candidates = candidates.len(), "Salida del detector decodificada");

        let kept = non_maximum_suppression(
            candidates,
            self.params.iou_threshold,
            self.params.max_detections,
        );

        Ok(kept
            .into_iter()
            .map(|b| RawBox { xyxy: geometry.restore(b.xyxy), ..b })
            .collect())
    }
}

#[async_trait]
impl DetectorPort for OnnxYoloEngine {
    async fn detect(&self, image: RgbImage) -> DomainResult<Vec<ResultSet>> {
        let inner = self.inner.clone();
        let boxes = tokio::task::spawn_blocking(move || inner.infer(&image))
            .await
            .map_err(|e| DomainError::Inference(e.to_string()))?
            .map_err(|e| DomainError::Inference(format!("{e:#}")))?;

        Ok(vec![ResultSet { names: self.inner.labels.clone(), boxes }])
    }
}
