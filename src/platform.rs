use core::future::Future;

pub fn init_platform() {
    env_logger::init();
}

/// Drive a wgpu future to completion on the current thread
pub fn block_on<F: Future>(fut: F) -> F::Output {
    pollster::block_on(fut)
}
