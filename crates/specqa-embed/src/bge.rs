use anyhow::{anyhow, ensure, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use specqa_core::traits::Embedder;

const BGE_M3_DIM: usize = 1024;
const MAX_LEN: usize = 256;
const BATCH_SIZE: usize = 16;
const PAD_ID: u32 = 1;

/// BGE-M3 sentence embeddings computed locally with candle.
pub struct BgeEmbedder { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device }

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => { info!("embedding device: Metal"); return dev; }
            Err(e) => warn!(error = %e, "Metal unavailable, falling back to CPU"),
        }
    }
    info!("embedding device: CPU");
    Device::Cpu
}

/// Average `hidden` ([B, T, H]) over the positions where `mask` ([B, T]) is
/// set and scale each row to unit length.
pub fn masked_mean_l2(hidden: &Tensor, mask: &Tensor) -> Result<Tensor> {
    let (batch, _, width) = hidden.dims3()?;
    let mask = mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?.maximum(1e-9)?;
    let mean = summed.broadcast_div(&counts)?;
    let norms = mean.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(1e-12)?;
    let pooled = mean.broadcast_div(&norms)?;
    ensure!(pooled.dims() == [batch, width], "pooled shape {:?}, expected [{batch}, {width}]", pooled.dims());
    Ok(pooled)
}

impl BgeEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
        let vb = VarBuilder::from_tensors(weights.into_iter().collect(), DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!("BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device })
    }

    /// Token ids and attention mask for `texts`, padded to the longest
    /// sequence in the batch and capped at `MAX_LEN`.
    fn encode(&self, texts: &[String]) -> Result<(Tensor, Tensor)> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("Tokenization failed: {e}"))?;
        let width = encodings.iter().map(|e| e.get_ids().len().min(MAX_LEN)).max().unwrap_or(1).max(1);

        let mut ids = Vec::with_capacity(texts.len() * width);
        let mut mask = Vec::with_capacity(texts.len() * width);
        for enc in &encodings {
            let n = enc.get_ids().len().min(width);
            ids.extend_from_slice(&enc.get_ids()[..n]);
            ids.resize(ids.len() + width - n, PAD_ID);
            mask.extend_from_slice(&enc.get_attention_mask()[..n]);
            mask.resize(mask.len() + width - n, 0);
        }
        let shape = (texts.len(), width);
        Ok((Tensor::from_vec(ids, shape, &self.device)?, Tensor::from_vec(mask, shape, &self.device)?))
    }

    fn embed_group(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = self.encode(texts)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let rows = masked_mean_l2(&hidden, &attention_mask)?.to_device(&Device::Cpu)?.to_vec2::<f32>()?;
        ensure!(
            rows.iter().all(|r| r.len() == BGE_M3_DIM),
            "model produced vectors that are not {BGE_M3_DIM}-dimensional"
        );
        Ok(rows)
    }
}

impl Embedder for BgeEmbedder {
    fn dim(&self) -> usize { BGE_M3_DIM }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for group in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_group(group)?);
        }
        let ms = start.elapsed().as_millis() as u64;
        debug!(texts = texts.len(), ms, "embedded batch");
        if texts.len() == 1 && ms > 100 { warn!(ms, "slow embedding"); }
        Ok(out)
    }
}

pub(crate) fn resolve_model_dir() -> Result<PathBuf> {
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { info!(var, dir = %p.display(), "using model dir from env"); return Ok(p); }
        }
    }
    for candidate in ["../models/bge-m3", "models/bge-m3"] {
        let p = Path::new(candidate);
        if p.exists() { return Ok(p.to_path_buf()); }
    }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}
