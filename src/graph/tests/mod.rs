mod batch;
mod dataloader;
