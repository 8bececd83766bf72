use std::fs;
use std::path::{Path, PathBuf};

use image::ColorType;

use crate::error::{Error, Result};
use crate::evidence::frame::Frame;
use crate::evidence::job::EvidenceJob;
use crate::tracker::Rect;

/// Persistence backend for confirmed violations.
///
/// Constructed by the caller and handed to the worker at startup. Delivery is
/// at-least-once, so implementations must tolerate the same job twice.
pub trait EvidenceStore: Send {
    fn persist(&mut self, job: &EvidenceJob) -> Result<()>;
}

/// Writes evidence to a local directory tree:
///
/// - `proofs/<label>_<identifier>_<ts>.jpg` padded crop
/// - `proofs/<label>_<identifier>_<ts>_labeled.jpg` full frame with the box drawn
/// - `proofs/<label>_<identifier>_<ts>/frame_NNNN.jpg` recent frame window
/// - `retraining/train_<vehicle>_<ts>.jpg` + `.txt` normalized YOLO label
pub struct FileEvidenceStore {
    proofs_dir: PathBuf,
    retraining_dir: PathBuf,
}

const BOX_COLOR: [u8; 3] = [255, 0, 0];
const BOX_THICKNESS: usize = 2;

impl FileEvidenceStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let proofs_dir = root.join("proofs");
        let retraining_dir = root.join("retraining");
        fs::create_dir_all(&proofs_dir)?;
        fs::create_dir_all(&retraining_dir)?;
        Ok(Self {
            proofs_dir,
            retraining_dir,
        })
    }

    pub fn proofs_dir(&self) -> &Path {
        &self.proofs_dir
    }

    pub fn retraining_dir(&self) -> &Path {
        &self.retraining_dir
    }

    fn save_retraining_data(&self, job: &EvidenceJob, ts: u64) -> Result<()> {
        let stem = format!("train_{}_{ts}", job.vehicle_id);
        save_jpeg(&job.frame, &self.retraining_dir.join(format!("{stem}.jpg")))?;

        let label = yolo_label(job.class_id, &job.bbox, job.frame.width(), job.frame.height());
        fs::write(self.retraining_dir.join(format!("{stem}.txt")), label)?;
        Ok(())
    }

    fn save_video_proof(&self, job: &EvidenceJob, stem: &str) -> Result<()> {
        if job.frame_window.is_empty() {
            return Ok(());
        }
        let clip_dir = self.proofs_dir.join(stem);
        fs::create_dir_all(&clip_dir)?;
        for (i, frame) in job.frame_window.iter().enumerate() {
            save_jpeg(frame, &clip_dir.join(format!("frame_{i:04}.jpg")))?;
        }
        Ok(())
    }
}

impl EvidenceStore for FileEvidenceStore {
    fn persist(&mut self, job: &EvidenceJob) -> Result<()> {
        let ts = job.unix_seconds();
        let stem = format!("{}_{}_{ts}", job.label_slug(), job.identifier_slug());

        if let Some(crop) = &job.proof_crop {
            save_jpeg(crop, &self.proofs_dir.join(format!("{stem}.jpg")))?;
        }
        self.save_retraining_data(job, ts)?;

        let labeled = draw_box(&job.frame, &job.bbox);
        save_jpeg(&labeled, &self.proofs_dir.join(format!("{stem}_labeled.jpg")))?;

        self.save_video_proof(job, &stem)?;
        Ok(())
    }
}

fn save_jpeg(frame: &Frame, path: &Path) -> Result<()> {
    let color = match frame.channels() {
        1 => ColorType::L8,
        3 => ColorType::Rgb8,
        n => {
            return Err(Error::Storage {
                identifier: path.display().to_string(),
                reason: format!("unsupported channel count {n}"),
            });
        }
    };
    image::save_buffer(path, &frame.to_bytes(), frame.width(), frame.height(), color)?;
    Ok(())
}

/// `class cx cy w h`, all normalized to the frame size.
fn yolo_label(class_id: u32, bbox: &Rect, width: u32, height: u32) -> String {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let (cx, cy) = bbox.center();
    format!(
        "{class_id} {:.6} {:.6} {:.6} {:.6}",
        cx / w,
        cy / h,
        bbox.width / w,
        bbox.height / h
    )
}

/// Copy of `frame` with the outline of `bbox` painted in.
fn draw_box(frame: &Frame, bbox: &Rect) -> Frame {
    let mut pixels = frame.as_ndarray().to_owned();
    let (rows, cols, channels) = pixels.dim();
    if rows == 0 || cols == 0 {
        return frame.clone();
    }

    let [x1, y1, x2, y2] = bbox.to_tlbr();
    let clamp_x = |v: f32| (v.max(0.0) as usize).min(cols - 1);
    let clamp_y = |v: f32| (v.max(0.0) as usize).min(rows - 1);
    let (x1, x2, y1, y2) = (clamp_x(x1), clamp_x(x2), clamp_y(y1), clamp_y(y2));

    let mut paint = |row: usize, col: usize| {
        for c in 0..channels {
            pixels[[row, col, c]] = BOX_COLOR[c.min(2)];
        }
    };

    for t in 0..BOX_THICKNESS {
        for col in x1..=x2 {
            paint((y1 + t).min(rows - 1), col);
            paint(y2.saturating_sub(t), col);
        }
        for row in y1..=y2 {
            paint(row, (x1 + t).min(cols - 1));
            paint(row, x2.saturating_sub(t));
        }
    }

    Frame::new(pixels, frame.index())
}
