use anyhow::{ensure, Result};
use clap::Parser;

use crate::domain::model::{Device, InferenceConfig, ModelId, YoloParams};

/// Configuración del proceso. Cada flag puede venir también del entorno.
#[derive(Parser, Debug, Clone)]
#[command(name = "yolo-predict-api", version, about = "Detección de objetos YOLOv8 sobre HTTP")]
pub struct ServerConfig {
    /// Dirección de escucha
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Detector YOLOv8 exportado a ONNX
    #[arg(long, env = "MODEL_PATH", default_value = "yolov8n.onnx")]
    pub model_path: String,

    /// Dispositivo de ejecución: `cpu` o `cuda`
    #[arg(long, env = "DEVICE", default_value_t = Device::Cpu)]
    pub device: Device,

    /// Resolución cuadrada de entrada del modelo
    #[arg(long, env = "INPUT_SIZE", default_value_t = 640)]
    pub input_size: u32,

    #[arg(long, env = "CONF_THRESHOLD", default_value_t = 0.25)]
    pub conf_threshold: f32,

    #[arg(long, env = "IOU_THRESHOLD", default_value_t = 0.7)]
    pub iou_threshold: f32,

    #[arg(long, env = "MAX_DETECTIONS", default_value_t = 300)]
    pub max_detections: usize,

    /// Tamaño máximo del cuerpo de la petición, en bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Hilos intra-op de ONNX Runtime
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.conf_threshold),
            "conf threshold must be within [0, 1], got {}",
            self.conf_threshold
        );
        ensure!(
            (0.0..=1.0).contains(&self.iou_threshold),
            "iou threshold must be within [0, 1], got {}",
            self.iou_threshold
        );
        ensure!(self.input_size > 0, "input size must be positive");
        ensure!(self.max_upload_bytes > 0, "max upload bytes must be positive");
        ensure!(self.intra_threads > 0, "intra threads must be positive");
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn inference(&self) -> InferenceConfig {
        InferenceConfig {
            model: ModelId::from_path(&self.model_path),
            params: YoloParams {
                input_size: self.input_size,
                conf_threshold: self.conf_threshold,
                iou_threshold: self.iou_threshold,
                max_detections: self.max_detections,
            },
            device: self.device,
            intra_threads: self.intra_threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cfg = ServerConfig::try_parse_from([
            "yolo-predict-api",
            "--port",
            "9000",
            "--device",
            "cuda",
            "--model-path",
            "models/yolov8s.onnx",
            "--conf-threshold",
            "0.5",
        ])
        .unwrap();

        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.device, Device::Cuda);
        let infer = cfg.inference();
        assert_eq!(infer.model.name, "yolov8s");
        assert_eq!(infer.params.conf_threshold, 0.5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_device() {
        assert!(ServerConfig::try_parse_from(["yolo-predict-api", "--device", "tpu"]).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_thresholds() {
        let mut cfg = ServerConfig::try_parse_from(["yolo-predict-api", "--iou-threshold", "0.7"]).unwrap();
        cfg.conf_threshold = 1.5;
        assert!(cfg.validate().is_err());
        cfg.conf_threshold = 0.25;
        cfg.input_size = 0;
        assert!(cfg.validate().is_err());
    }
}
