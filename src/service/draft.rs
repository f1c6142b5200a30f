use crate::models::InvoiceDraft;

/// 上传评审状态机, 与渲染层无关
/// 草稿只存内存, 进程重启即丢失; 状态串行推进,
/// 同一草稿不会有两个抽取请求同时在途
#[derive(Debug, Clone, PartialEq)]
pub enum DraftState {
    /// 未选择文件
    Idle,
    /// 文件已交给抽取管线, 等待结果
    Uploading,
    /// 草稿可编辑
    Reviewing(InvoiceDraft),
    /// 写库进行中, 保留草稿以便失败回退
    Confirming(InvoiceDraft),
}

/// 状态机事件
#[derive(Debug, Clone)]
pub enum DraftEvent {
    FileSelected,
    Extracted(InvoiceDraft),
    ExtractionFailed,
    EditVendor(String),
    EditQuantity { index: usize, quantity: f64 },
    EditUnitPrice { index: usize, unit_price: f64 },
    Confirm,
    ConfirmSucceeded,
    ConfirmFailed,
    Discard,
}

/// 编辑数量/单价后同步重算:
/// 该行小计 = 数量 × 单价, 发票总额 = 各行小计之和
fn recompute_after_edit(draft: &mut InvoiceDraft, index: usize) {
    if let Some(item) = draft.items.get_mut(index) {
        item.total = item.quantity * item.unit_price;
    }
    draft.total_amount = draft.items.iter().map(|i| i.total).sum();
}

/// 单一转移函数. 未定义的 (状态, 事件) 组合保持原状态不变
pub fn transition(state: DraftState, event: DraftEvent) -> DraftState {
    use DraftEvent::*;
    use DraftState::*;

    match (state, event) {
        (_, Discard) => Idle,

        (Idle, FileSelected) => Uploading,
        (Uploading, Extracted(draft)) => Reviewing(draft),
        (Uploading, ExtractionFailed) => Idle,

        (Reviewing(mut draft), EditVendor(vendor)) => {
            draft.vendor = vendor;
            Reviewing(draft)
        }
        (Reviewing(mut draft), EditQuantity { index, quantity }) => {
            if let Some(item) = draft.items.get_mut(index) {
                item.quantity = quantity;
            }
            recompute_after_edit(&mut draft, index);
            Reviewing(draft)
        }
        (Reviewing(mut draft), EditUnitPrice { index, unit_price }) => {
            if let Some(item) = draft.items.get_mut(index) {
                item.unit_price = unit_price;
            }
            recompute_after_edit(&mut draft, index);
            Reviewing(draft)
        }
        (Reviewing(draft), Confirm) => Confirming(draft),

        (Confirming(_), ConfirmSucceeded) => Idle,
        // 写库失败: 回到评审态, 草稿原样保留, 用户可再次确认
        (Confirming(draft), ConfirmFailed) => Reviewing(draft),

        (state, _) => state,
    }
}
