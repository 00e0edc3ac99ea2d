// 该文件是 Qingxi （清晰） 项目的一部分。
// src/task.rs - 任务调度
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{thread, time::Duration};
use tracing::{info, warn};

use crate::{
  frame::FrameSource,
  model::Model,
  output::Render,
  rejection::{Reject, Rejection},
};

const UNKNOWN_SOURCE: &str = "unknown";
const DEFAULT_REPEAT_TIMES: usize = 1000;
const WARM_UP_TIMES: usize = 2;

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 推理一帧并输出，推理被拒绝时输出并返回拒绝结果
fn infer_and_render<F, D, M, O>(frame: &F, model: &M, output: &O) -> anyhow::Result<Option<Rejection>>
where
  F: FrameSource,
  M: Model<Input = F, Output = D>,
  M::Error: Reject,
  O: Render<F, D>,
  O::Error: std::error::Error + Sync + Send + 'static,
{
  match model.infer(frame) {
    Ok(result) => {
      output.render_result(frame, &result)?;
      Ok(None)
    }
    Err(error) => {
      let rejection = Rejection::new(frame.frame_source(), &error);
      warn!("{}", rejection);
      output.render_rejection(Some(frame), &rejection)?;
      Ok(Some(rejection))
    }
  }
}

/// 输入无法产生帧时输出拒绝结果
fn render_input_error<F, D, E, O>(error: &E, output: &O) -> anyhow::Result<Rejection>
where
  E: Reject,
  O: Render<F, D>,
  O::Error: std::error::Error + Sync + Send + 'static,
{
  let rejection = Rejection::from_error(error, UNKNOWN_SOURCE);
  warn!("{}", rejection);
  output.render_rejection(None, &rejection)?;
  Ok(rejection)
}

pub struct OneShotTask;

impl<
  F: FrameSource,
  D,
  IE: Reject,
  ME: Reject,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = match input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))? {
      Ok(frame) => frame,
      Err(error) => return Err(render_input_error::<F, D, _, _>(&error, &output)?.into()),
    };
    info!("输入帧获取成功，开始推理...");
    let now = std::time::Instant::now();
    if let Some(rejection) = infer_and_render(&frame, &model, &output)? {
      return Err(rejection.into());
    }
    info!("推理与输出完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat_times: DEFAULT_REPEAT_TIMES,
    }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times.max(1);
    self
  }
}

impl<
  F: FrameSource,
  D,
  IE: Reject,
  ME: Reject,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = match input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))? {
      Ok(frame) => frame,
      Err(error) => return Err(render_input_error::<F, D, _, _>(&error, &output)?.into()),
    };
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.repeat_times);
    for i in 0..self.repeat_times {
      let now = std::time::Instant::now();
      // 同一帧每次结果相同，被拒绝一次就不必继续
      if let Some(rejection) = infer_and_render(&frame, &model, &output)? {
        return Err(rejection.into());
      }
      let elapsed = now.elapsed();
      info!("({})推理与输出完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
    }

    let skip = if times.len() > WARM_UP_TIMES { WARM_UP_TIMES } else { 0 };
    let counted = (times.len() - skip) as u32;
    warn!(
      "平均耗时: {:.2?}",
      times.iter().skip(skip).sum::<Duration>() / counted
    );

    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<
  F: FrameSource,
  D,
  IE: Reject,
  ME: Reject,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    let handler = ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    });
    if let Err(error) = handler {
      warn!("无法设置中断信号处理: {}", error);
    }

    let mut frame_index = 0usize;
    let mut rejected = 0usize;
    let mut now = std::time::Instant::now();
    for item in input {
      frame_index = frame_index.wrapping_add(1);
      info!("处理第 {} 帧图像", frame_index);
      let rejection = match item {
        Ok(frame) => infer_and_render(&frame, &model, &output)?,
        Err(error) => Some(render_input_error::<F, D, _, _>(&error, &output)?),
      };
      if rejection.is_some() {
        rejected += 1;
      }
      info!("第 {} 帧完成，耗时: {:.2?}", frame_index, now.elapsed());
      now = std::time::Instant::now();

      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共 {} 帧，其中 {} 帧被拒绝", frame_index, rejected);
    Ok(())
  }
}
